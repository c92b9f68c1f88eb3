//! Parser for .ir files.

use crate::error::{Location, ParseError, ParseResult};
use crate::lexer::{self, LexError, Lexer, Token};
use crate::options::parse_options;
use crate::run_command::{Comparison, Invocation, RunCommand};
use crate::sourcemap::SourceMap;
use crate::testcommand::TestCommand;
use crate::testfile::{Comment, Details, TestFile};
use cubefold_codegen::ir::entities::AnyEntity;
use cubefold_codegen::ir::types;
use cubefold_codegen::ir::{
    Block, Function, Imm64, InstructionData, Opcode, Signature, StackSlot, StackSlotData, Type,
    Value,
};
use cubefold_codegen::settings::{self, Flags};
use cubefold_codegen::timing;
use smallvec::SmallVec;
use std::mem;

/// Parse the entire `text` into a list of functions.
///
/// Any test commands or `set` lines are ignored.
pub fn parse_functions(text: &str) -> ParseResult<Vec<Function>> {
    let _tt = timing::parse_text();
    parse_test(text).map(|file| file.functions.into_iter().map(|(func, _)| func).collect())
}

/// Parse the entire `text` as a test case file.
///
/// The returned `TestFile` contains direct references to substrings of `text`.
pub fn parse_test(text: &str) -> ParseResult<TestFile<'_>> {
    let _tt = timing::parse_text();
    let mut parser = Parser::new(text);

    // Gather the preamble comments.
    parser.start_gathering_comments();

    let commands = parser.parse_test_commands();
    let flags = parser.parse_settings()?;

    parser.token();
    let preamble_comments = parser.take_comments();
    let functions = parser.parse_function_list()?;

    Ok(TestFile {
        commands,
        flags,
        preamble_comments,
        functions,
    })
}

/// Parse a run command from the text of a comment, like `; run: %cubic(2, 3) == 125`.
///
/// Returns `Ok(None)` when the comment is not a run command. The arguments and expected results
/// are checked against `signature` and wrapped to their types.
pub fn parse_run_command(text: &str, signature: &Signature) -> ParseResult<Option<RunCommand>> {
    let _tt = timing::parse_text();
    // We remove leading spaces and semi-colons for convenience here instead of at the top level
    // because only run commands are ever parsed out of comment text.
    let trimmed = text.trim_start_matches(|c| c == ' ' || c == ';');
    let mut parser = Parser::new(trimmed);
    match parser.token() {
        Some(Token::Identifier("run")) | Some(Token::Identifier("print")) => {
            let command = parser.parse_run_command(signature);
            parser.check_lex_error(command).map(Some)
        }
        Some(_) | None => Ok(None),
    }
}

/// Recursive-descent parser over the tokens of a `.ir` file.
pub struct Parser<'a> {
    lex: Lexer<'a>,

    // The first lexical error. Once set, no more tokens are produced.
    lex_error: Option<LexError>,

    // Current lookahead token.
    lookahead: Option<Token<'a>>,

    // Location of lookahead.
    loc: Location,

    // The currently active entity that should be associated with collected comments, or `None` if
    // comments are ignored.
    comment_entity: Option<AnyEntity>,

    // Comments collected so far.
    comments: Vec<Comment<'a>>,
}

// Context for resolving references when parsing a single function.
struct Context {
    function: Function,
    map: SourceMap,
}

impl Context {
    fn new(f: Function) -> Self {
        Self {
            function: f,
            map: SourceMap::new(),
        }
    }

    // Allocate a new stack slot.
    fn add_ss(&mut self, ss: u32, data: StackSlotData, loc: Location) -> ParseResult<()> {
        let slot = self.function.create_stack_slot(data);
        self.map.def_ss(ss, slot, loc)
    }

    // Resolve a reference to a stack slot.
    fn get_ss(&self, number: u32, loc: Location) -> ParseResult<StackSlot> {
        match self.map.get_ss(number) {
            Some(ss) => Ok(ss),
            None => err!(loc, "undefined stack slot ss{}", number),
        }
    }

    // Allocate a new block and add a mapping src_block -> Block.
    fn add_block(&mut self, src_block: Block, loc: Location) -> ParseResult<Block> {
        let block = self.function.create_block();
        self.map.def_block(src_block, block, loc).and(Ok(block))
    }

    // Resolve a value operand. Values must be defined before they are used, so this is never a
    // forward reference.
    fn get_value(&self, src: Value, loc: Location) -> ParseResult<Value> {
        match self.map.get_value(src) {
            Some(v) => Ok(v),
            None => err!(loc, "undefined value {}", src),
        }
    }

    // The parser creates `jump` instructions with the source block numbering since blocks can be
    // referenced before their header is seen. Rewrite them once the whole body is parsed.
    fn rewrite_references(&mut self) -> ParseResult<()> {
        let Self { function, map } = self;
        for block in function.layout.blocks() {
            for inst in function.layout.block_insts(block) {
                if let InstructionData::Jump { destination, .. } = &mut function.dfg[inst] {
                    map.rewrite_block(destination, inst.into())?;
                }
            }
        }
        Ok(())
    }
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` which reads `text`. The referenced text must outlive the parser.
    pub fn new(text: &'a str) -> Self {
        Self {
            lex: Lexer::new(text),
            lex_error: None,
            lookahead: None,
            loc: Location { line_number: 0 },
            comment_entity: None,
            comments: Vec::new(),
        }
    }

    // Consume the current lookahead token and return it.
    fn consume(&mut self) -> Token<'a> {
        self.lookahead.take().expect("No token to consume")
    }

    // Consume the whole line following the current lookahead token.
    // Return the text of the line tail.
    fn consume_line(&mut self) -> &'a str {
        let rest = self.lex.rest_of_line();
        self.consume();
        rest
    }

    // Get the current lookahead token, after making sure there is one.
    fn token(&mut self) -> Option<Token<'a>> {
        while self.lookahead.is_none() && self.lex_error.is_none() {
            match self.lex.next() {
                Some(Ok(lexer::LocatedToken { token, location })) => {
                    match token {
                        Token::Comment(text) => {
                            // Gather comments, associate them with `comment_entity`.
                            if let Some(entity) = self.comment_entity {
                                self.comments.push(Comment { entity, text });
                            }
                        }
                        _ => self.lookahead = Some(token),
                    }
                    self.loc = location;
                }
                Some(Err(lexer::LocatedError { error, location })) => {
                    self.lex_error = Some(error);
                    self.loc = location;
                    break;
                }
                None => break,
            }
        }
        self.lookahead
    }

    // Report a lexical error in place of whatever the parser tripped over after it.
    fn check_lex_error<T>(&self, result: ParseResult<T>) -> ParseResult<T> {
        match self.lex_error {
            Some(LexError::InvalidChar) => err!(self.loc, "invalid character"),
            None => result,
        }
    }

    // Begin gathering comments associated with `entity`.
    fn gather_comments<E: Into<AnyEntity>>(&mut self, entity: E) {
        self.comment_entity = Some(entity.into());
    }

    // Get the comments collected so far, clearing out the internal list.
    fn take_comments(&mut self) -> Vec<Comment<'a>> {
        mem::take(&mut self.comments)
    }

    // Start gathering comments for the whole function.
    fn start_gathering_comments(&mut self) {
        self.gather_comments(AnyEntity::Function);
    }

    // Match and consume a token without payload.
    fn match_token(&mut self, want: Token<'a>, err_msg: &str) -> ParseResult<Token<'a>> {
        if self.token() == Some(want) {
            Ok(self.consume())
        } else {
            err!(self.loc, err_msg)
        }
    }

    // If the next token is a `want`, consume it, otherwise do nothing.
    fn optional(&mut self, want: Token<'a>) -> bool {
        if self.token() == Some(want) {
            self.consume();
            true
        } else {
            false
        }
    }

    // Match and consume a specific identifier string.
    // Used for pseudo-keywords like "explicit_slot" that only appear in certain contexts.
    fn match_identifier(&mut self, want: &'static str, err_msg: &str) -> ParseResult<Token<'a>> {
        if self.token() == Some(Token::Identifier(want)) {
            Ok(self.consume())
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a type.
    fn match_type(&mut self, err_msg: &str) -> ParseResult<Type> {
        if let Some(Token::Type(t)) = self.token() {
            self.consume();
            Ok(t)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a stack slot reference.
    fn match_ss(&mut self, err_msg: &str) -> ParseResult<u32> {
        if let Some(Token::StackSlot(ss)) = self.token() {
            self.consume();
            Ok(ss)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a block reference.
    fn match_block(&mut self, err_msg: &str) -> ParseResult<Block> {
        if let Some(Token::Block(block)) = self.token() {
            self.consume();
            Ok(block)
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a value reference.
    // This does not convert from the source value numbering to our in-memory value numbering.
    fn match_value(&mut self, err_msg: &str) -> ParseResult<Value> {
        if let Some(Token::Value(v)) = self.token() {
            self.consume();
            Ok(v)
        } else {
            err!(self.loc, err_msg)
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::new(self.loc, message)
    }

    // Match and consume an Imm64 immediate.
    fn match_imm64(&mut self, err_msg: &str) -> ParseResult<Imm64> {
        if let Some(Token::Integer(text)) = self.token() {
            self.consume();
            // Lexer just gives us raw text that looks like an integer.
            // Parse it as an Imm64 to check for overflow and other issues.
            text.parse().map_err(|e| self.error(e))
        } else {
            err!(self.loc, err_msg)
        }
    }

    // Match and consume a u32 immediate.
    // This is used for stack slot sizes.
    fn match_uimm32(&mut self, err_msg: &str) -> ParseResult<u32> {
        if let Some(Token::Integer(text)) = self.token() {
            self.consume();
            text.parse()
                .map_err(|_| self.error("expected u32 decimal immediate"))
        } else {
            err!(self.loc, err_msg)
        }
    }

    /// Parse a list of test commands.
    pub fn parse_test_commands(&mut self) -> Vec<TestCommand<'a>> {
        let mut list = Vec::new();
        while self.token() == Some(Token::Identifier("test")) {
            list.push(TestCommand::new(self.consume_line()));
        }
        list
    }

    /// Parse the `set` lines following the test commands.
    ///
    /// The `set` commands are cumulative. The verifier is enabled by default since text files
    /// are only read for testing and debugging.
    pub fn parse_settings(&mut self) -> ParseResult<Flags> {
        let mut flag_builder = settings::builder();
        while self.token() == Some(Token::Identifier("set")) {
            let loc = self.loc;
            parse_options(
                self.consume_line().split_whitespace(),
                &mut flag_builder,
                loc,
            )?;
        }
        Ok(Flags::new(flag_builder))
    }

    /// Parse a list of function definitions.
    ///
    /// This is the top-level parse function matching the whole contents of a file.
    pub fn parse_function_list(&mut self) -> ParseResult<Vec<(Function, Details<'a>)>> {
        let mut list = Vec::new();
        while self.token().is_some() {
            let function = self.parse_function();
            list.push(self.check_lex_error(function)?);
        }
        self.check_lex_error(Ok(list))
    }

    // Parse a whole function definition.
    //
    // function ::= * "function" name signature "{" preamble function-body "}"
    //
    fn parse_function(&mut self) -> ParseResult<(Function, Details<'a>)> {
        // Begin gathering comments.
        // Make sure we don't include any comments before the `function` keyword.
        self.token();
        self.comments.clear();
        self.start_gathering_comments();

        let (location, name, sig) = self.parse_function_spec()?;
        let mut ctx = Context::new(Function::with_name_signature(name, sig));

        // function ::= function-spec * "{" preamble function-body "}"
        self.match_token(Token::LBrace, "expected '{' before function body")?;

        // function ::= function-spec "{" * preamble function-body "}"
        self.parse_preamble(&mut ctx)?;
        // function ::= function-spec "{"  preamble * function-body "}"
        self.parse_function_body(&mut ctx)?;
        // function ::= function-spec "{" preamble function-body * "}"
        self.match_token(Token::RBrace, "expected '}' after function body")?;

        // Collect any comments following the end of the function, then stop gathering comments.
        self.start_gathering_comments();
        self.token();
        self.comment_entity = None;

        // Rewrite references to blocks after parsing everything to allow forward jumps.
        ctx.rewrite_references()?;

        let details = Details {
            location,
            comments: self.take_comments(),
            map: ctx.map,
        };

        Ok((ctx.function, details))
    }

    // Parse a function spec.
    //
    // function-spec ::= * "function" name signature
    //
    fn parse_function_spec(&mut self) -> ParseResult<(Location, String, Signature)> {
        self.match_identifier("function", "expected 'function'")?;
        let location = self.loc;

        // function-spec ::= "function" * name signature
        let name = self.parse_function_name()?;

        // function-spec ::= "function" name * signature
        let sig = self.parse_signature()?;

        Ok((location, name, sig))
    }

    // Parse a function name.
    //
    // function ::= "function" * name signature { ... }
    //
    fn parse_function_name(&mut self) -> ParseResult<String> {
        match self.token() {
            Some(Token::Name(s)) => {
                self.consume();
                Ok(s.to_string())
            }
            _ => err!(self.loc, "expected function name"),
        }
    }

    // Parse a function signature.
    //
    // signature ::=  * "(" [paramlist] ")" ["->" retlist]
    //
    fn parse_signature(&mut self) -> ParseResult<Signature> {
        let mut sig = Signature::default();

        self.match_token(Token::LPar, "expected function signature: ( args... )")?;
        // signature ::=  "(" * [paramlist] ")" ["->" retlist]
        if self.token() != Some(Token::RPar) {
            sig.params = self.parse_type_list()?;
        }
        self.match_token(Token::RPar, "expected ')' after function arguments")?;
        if self.optional(Token::Arrow) {
            sig.returns = self.parse_type_list()?;
        }

        Ok(sig)
    }

    // Parse list of function parameter / return value types.
    //
    // paramlist ::= * type { "," type }
    //
    fn parse_type_list(&mut self) -> ParseResult<Vec<Type>> {
        let mut list = Vec::new();

        // paramlist ::= * type { "," type }
        list.push(self.match_type("expected argument type")?);

        // paramlist ::= type * { "," type }
        while self.optional(Token::Comma) {
            // paramlist ::= type { "," * type }
            list.push(self.match_type("expected argument type")?);
        }

        Ok(list)
    }

    // Parse the function preamble.
    //
    // preamble      ::= * { preamble-decl }
    // preamble-decl ::= * stack-slot-decl
    //
    fn parse_preamble(&mut self, ctx: &mut Context) -> ParseResult<()> {
        while let Some(Token::StackSlot(..)) = self.token() {
            let loc = self.loc;
            let (num, data) = self.parse_stack_slot_decl()?;
            ctx.add_ss(num, data, loc)?;
            if let Some(ss) = ctx.map.get_ss(num) {
                self.gather_comments(ss);
            }
        }
        Ok(())
    }

    // Parse a stack slot decl.
    //
    // stack-slot-decl ::= * StackSlot(ss) "=" "explicit_slot" Bytes
    //
    fn parse_stack_slot_decl(&mut self) -> ParseResult<(u32, StackSlotData)> {
        let ss = self.match_ss("expected stack slot number: ss«n»")?;
        self.match_token(Token::Equal, "expected '=' in stack slot declaration")?;
        self.match_identifier("explicit_slot", "expected stack slot kind 'explicit_slot'")?;

        // stack-slot-decl ::= StackSlot(ss) "=" "explicit_slot" * Bytes
        let bytes = self.match_uimm32("expected byte-size in stack_slot decl")?;
        if bytes > u32::from(u16::MAX) {
            return err!(self.loc, "stack slot too large");
        }

        Ok((ss, StackSlotData::new(bytes)))
    }

    // Parse a function body, add contents to `ctx`.
    //
    // function-body ::= * { basic-block }
    //
    fn parse_function_body(&mut self, ctx: &mut Context) -> ParseResult<()> {
        while self.token() != Some(Token::RBrace) {
            self.parse_basic_block(ctx)?;
        }
        Ok(())
    }

    // Parse a basic block, add contents to `ctx`.
    //
    // basic-block  ::= * block-header { instruction }
    // block-header ::= Block(block) [block-params] ":"
    //
    fn parse_basic_block(&mut self, ctx: &mut Context) -> ParseResult<()> {
        let block_num = self.match_block("expected block header")?;
        let block = ctx.add_block(block_num, self.loc)?;
        self.gather_comments(block);

        if !self.optional(Token::Colon) {
            // block-header ::= Block(block) [ * block-params ] ":"
            self.parse_block_params(ctx, block)?;
            self.match_token(Token::Colon, "expected ':' after block parameters")?;
        }

        // basic-block ::= block-header * { instruction }
        while matches!(
            self.token(),
            Some(Token::Value(_)) | Some(Token::Identifier(_))
        ) {
            self.parse_instruction(ctx, block)?;
        }

        Ok(())
    }

    // Parse parenthesized list of block parameters.
    //
    // block-params ::= * "(" block-param { "," block-param } ")"
    fn parse_block_params(&mut self, ctx: &mut Context, block: Block) -> ParseResult<()> {
        // block-params ::= * "(" block-param { "," block-param } ")"
        self.match_token(Token::LPar, "expected '(' before block parameters")?;

        // block-params ::= "(" * block-param { "," block-param } ")"
        self.parse_block_param(ctx, block)?;

        // block-params ::= "(" block-param * { "," block-param } ")"
        while self.optional(Token::Comma) {
            // block-params ::= "(" block-param { "," * block-param } ")"
            self.parse_block_param(ctx, block)?;
        }

        // block-params ::= "(" block-param { "," block-param } * ")"
        self.match_token(Token::RPar, "expected ')' after block parameters")?;

        Ok(())
    }

    // Parse a single block parameter declaration, and append it to `block`.
    //
    // block-param ::= * Value(v) ":" Type(t)
    //
    fn parse_block_param(&mut self, ctx: &mut Context, block: Block) -> ParseResult<()> {
        // block-param ::= * Value(v) ":" Type(t)
        let v = self.match_value("block argument must be a value")?;
        let v_location = self.loc;
        // block-param ::= Value(v) * ":" Type(t)
        self.match_token(Token::Colon, "expected ':' after block argument")?;
        // block-param ::= Value(v) ":" * Type(t)
        let t = self.match_type("expected block argument type")?;
        // Allocate the block argument and add the mapping.
        let value = ctx.function.dfg.append_block_param(block, t);
        ctx.map.def_value(v, value, v_location)
    }

    // Parse an instruction, append it to `block`.
    //
    // instruction ::= [inst-result "="] Opcode(opc) ["." Type] operands ...
    //
    fn parse_instruction(&mut self, ctx: &mut Context, block: Block) -> ParseResult<()> {
        // Comments read before the first token belong to the previous entity. Any read while
        // parsing the operands trail this instruction.
        let first = self.token();
        let trailing = self.comments.len();

        // inst-result ::= * Value(v)
        let result = match first {
            Some(Token::Value(v)) => {
                self.consume();
                let loc = self.loc;
                self.match_token(Token::Equal, "expected '=' after instruction result")?;
                Some((v, loc))
            }
            _ => None,
        };

        // instruction ::= [inst-result "="] * Opcode(opc) ["." Type] ...
        let opcode = if let Some(Token::Identifier(text)) = self.token() {
            match text.parse::<Opcode>() {
                Ok(opc) => opc,
                Err(msg) => return err!(self.loc, "{}: '{}'", msg, text),
            }
        } else {
            return err!(self.loc, "expected instruction opcode");
        };
        let opcode_loc = self.loc;
        self.consume();

        // Look for a controlling type variable annotation.
        // instruction ::= [inst-result "="] Opcode(opc) * ["." Type] ...
        let explicit_ctrl_type = if self.optional(Token::Dot) {
            Some(self.match_type("expected type after 'opcode.'")?)
        } else {
            None
        };

        match (opcode.has_result(), result.is_some()) {
            (true, false) => {
                return err!(opcode_loc, "instruction {} produces a result value", opcode);
            }
            (false, true) => {
                return err!(opcode_loc, "instruction {} has no result value", opcode);
            }
            _ => {}
        }
        match (opcode.requires_typevar_operand(), explicit_ctrl_type) {
            (true, None) => {
                return err!(opcode_loc, "{} requires a type suffix, e.g. {}.i32", opcode, opcode);
            }
            (false, Some(ty)) => {
                return err!(opcode_loc, "{} does not take a type suffix '.{}'", opcode, ty);
            }
            _ => {}
        }
        let ctrl_type = explicit_ctrl_type.unwrap_or(types::I64);

        // instruction ::= [inst-result "="] Opcode(opc) ["." Type] * operands ...
        let (data, ctrl_typevar) = self.parse_inst_operands(ctx, opcode, ctrl_type)?;

        let inst = ctx.function.dfg.make_inst(data);
        ctx.function.dfg.make_inst_results(inst, ctrl_typevar);
        ctx.function.layout.append_inst(inst, block);
        ctx.map.def_entity(inst.into(), opcode_loc)?;

        if let Some((src, loc)) = result {
            let value = ctx.function.dfg.first_result(inst);
            ctx.map.def_value(src, value, loc)?;
        }

        for comment in &mut self.comments[trailing..] {
            comment.entity = inst.into();
        }
        // Collect comments for the next instruction.
        self.gather_comments(inst);

        Ok(())
    }

    // Parse the operands following the opcode, and return the instruction data together with
    // the controlling type of the result.
    fn parse_inst_operands(
        &mut self,
        ctx: &Context,
        opcode: Opcode,
        ctrl_type: Type,
    ) -> ParseResult<(InstructionData, Type)> {
        let idata = match opcode {
            Opcode::Iconst => {
                let imm = self.match_imm64("expected immediate integer operand")?;
                let data = InstructionData::UnaryImm {
                    opcode,
                    imm: Imm64::new(ctrl_type.wrap(imm.bits())),
                };
                (data, ctrl_type)
            }
            Opcode::Iadd | Opcode::Isub | Opcode::Imul => {
                let lhs = self.match_value("expected SSA value first operand")?;
                let lhs = ctx.get_value(lhs, self.loc)?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let rhs = self.match_value("expected SSA value second operand")?;
                let rhs = ctx.get_value(rhs, self.loc)?;
                let data = InstructionData::Binary {
                    opcode,
                    args: [lhs, rhs],
                };
                (data, ctx.function.dfg.value_type(lhs))
            }
            Opcode::StackLoad => {
                let ss = self.match_ss("expected stack slot number: ss«n»")?;
                let stack_slot = ctx.get_ss(ss, self.loc)?;
                (InstructionData::StackLoad { opcode, stack_slot }, ctrl_type)
            }
            Opcode::StackStore => {
                let arg = self.match_value("expected SSA value operand")?;
                let arg = ctx.get_value(arg, self.loc)?;
                self.match_token(Token::Comma, "expected ',' between operands")?;
                let ss = self.match_ss("expected stack slot number: ss«n»")?;
                let stack_slot = ctx.get_ss(ss, self.loc)?;
                let data = InstructionData::StackStore {
                    opcode,
                    arg,
                    stack_slot,
                };
                (data, ctx.function.dfg.value_type(arg))
            }
            Opcode::Jump => {
                // The destination keeps its source number until `rewrite_references`.
                let destination = self.match_block("expected jump destination block")?;
                (InstructionData::Jump { opcode, destination }, ctrl_type)
            }
            Opcode::Return => {
                let args = self.parse_value_list(ctx)?;
                (InstructionData::MultiAry { opcode, args }, ctrl_type)
            }
        };
        Ok(idata)
    }

    // Parse a possibly empty list of value operands.
    //
    // value_list ::= [ value { "," value } ]
    //
    fn parse_value_list(&mut self, ctx: &Context) -> ParseResult<SmallVec<[Value; 2]>> {
        let mut args = SmallVec::new();

        if let Some(Token::Value(v)) = self.token() {
            self.consume();
            args.push(ctx.get_value(v, self.loc)?);
        } else {
            return Ok(args);
        }

        while self.optional(Token::Comma) {
            let v = self.match_value("expected value in argument list")?;
            args.push(ctx.get_value(v, self.loc)?);
        }

        Ok(args)
    }

    /// Parse a run command, e.g. `run: %cubic(2, 3) == 125`.
    ///
    /// The leading `;` must already be stripped.
    fn parse_run_command(&mut self, sig: &Signature) -> ParseResult<RunCommand> {
        let command = match self.token() {
            Some(Token::Identifier("run")) => {
                self.consume();
                self.match_token(Token::Colon, "expected a ':' after 'run'")?;
                let invocation = self.parse_run_invocation(sig)?;
                if self.token().is_none() {
                    RunCommand::Print(invocation)
                } else {
                    let comparison = self.parse_run_comparison()?;
                    let expected = self.parse_run_expected(sig)?;
                    RunCommand::Run(invocation, comparison, expected)
                }
            }
            Some(Token::Identifier("print")) => {
                self.consume();
                self.match_token(Token::Colon, "expected a ':' after 'print'")?;
                RunCommand::Print(self.parse_run_invocation(sig)?)
            }
            _ => return err!(self.loc, "expected a 'run:' or 'print:' command"),
        };
        if self.token().is_some() {
            return err!(self.loc, "unexpected text after run command");
        }
        Ok(command)
    }

    // Parse the invocation part of a run command: `%fn(arg, arg, ...)`.
    fn parse_run_invocation(&mut self, sig: &Signature) -> ParseResult<Invocation> {
        let func = match self.token() {
            Some(Token::Name(name)) => {
                self.consume();
                name
            }
            _ => return err!(self.loc, "expected a function name, e.g. %my_fn"),
        };

        self.match_token(Token::LPar, "expected invocation parentheses, e.g. %fn(...)")?;
        let args = self.parse_run_values(&sig.params, Token::RPar, "argument")?;
        self.match_token(Token::RPar, "expected invocation parentheses, e.g. %fn(...)")?;

        Ok(Invocation::new(func, args))
    }

    // Parse a comparison operator for run commands: `==` or `!=`.
    fn parse_run_comparison(&mut self) -> ParseResult<Comparison> {
        match self.token() {
            Some(Token::Equal) => {
                self.consume();
                self.match_token(Token::Equal, "expected another '='")?;
                Ok(Comparison::Equals)
            }
            Some(Token::Bang) => {
                self.consume();
                self.match_token(Token::Equal, "expected a '=' after '!'")?;
                Ok(Comparison::NotEquals)
            }
            _ => err!(self.loc, "unable to parse a valid comparison operator"),
        }
    }

    // Parse the expected results: a single integer or a bracketed list.
    fn parse_run_expected(&mut self, sig: &Signature) -> ParseResult<Vec<i64>> {
        if self.optional(Token::LBracket) {
            let values = self.parse_run_values(&sig.returns, Token::RBracket, "return")?;
            self.match_token(Token::RBracket, "expected ']' after expected results")?;
            Ok(values)
        } else {
            let imm = self.match_imm64("expected an integer result")?;
            match sig.returns.as_slice() {
                [ty] => Ok(vec![ty.wrap(imm.bits())]),
                returns => err!(self.loc, "expected {} return values, found 1", returns.len()),
            }
        }
    }

    // Parse a comma-separated list of integers terminated by `close`, checking it against the
    // `types` it must match.
    fn parse_run_values(
        &mut self,
        types: &[Type],
        close: Token<'a>,
        what: &str,
    ) -> ParseResult<Vec<i64>> {
        let mut values = Vec::new();
        if self.token() != Some(close) {
            loop {
                let imm = self.match_imm64("expected an integer value")?;
                values.push(imm.bits());
                if !self.optional(Token::Comma) {
                    break;
                }
            }
        }
        if values.len() != types.len() {
            return err!(
                self.loc,
                "expected {} {} values, found {}",
                types.len(),
                what,
                values.len()
            );
        }
        Ok(values
            .into_iter()
            .zip(types)
            .map(|(x, ty)| ty.wrap(x))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Comparison, RunCommand};
    use cubefold_codegen::settings::OptLevel;

    #[test]
    fn signature() {
        let sig = Parser::new("()").parse_signature().unwrap();
        assert_eq!(sig.params.len(), 0);
        assert_eq!(sig.returns.len(), 0);

        let sig2 = Parser::new("(i8, i32) -> i32, i64")
            .parse_signature()
            .unwrap();
        assert_eq!(sig2.to_string(), "(i8, i32) -> i32, i64");

        assert_eq!(
            Parser::new("(i8, i32").parse_signature().unwrap_err().to_string(),
            "1: expected ')' after function arguments"
        );
        assert_eq!(
            Parser::new("(i8,)").parse_signature().unwrap_err().to_string(),
            "1: expected argument type"
        );
        assert_eq!(
            Parser::new("i8)").parse_signature().unwrap_err().to_string(),
            "1: expected function signature: ( args... )"
        );
    }

    #[test]
    fn stack_slot_decl() {
        let (func, _) = Parser::new(
            "function %foo() {
                 ss3 = explicit_slot 13
                 ss1 = explicit_slot 1
             }",
        )
        .parse_function()
        .unwrap();
        assert_eq!(func.name, "foo");
        let mut iter = func.stack_slots.keys();
        let _ss0 = iter.next().unwrap();
        let ss1 = iter.next().unwrap();
        assert_eq!(ss1.to_string(), "ss1");
        assert_eq!(func.stack_slots[ss1].size, 1);
        assert_eq!(iter.next(), None);

        // Catch duplicate definitions.
        assert_eq!(
            Parser::new(
                "function %bar() {
                     ss1  = explicit_slot 13
                     ss1  = explicit_slot 1
                 }",
            )
            .parse_function()
            .unwrap_err()
            .to_string(),
            "3: duplicate entity: ss1"
        );

        assert_eq!(
            Parser::new(
                "function %bar() {
                     ss0 = spill_slot 4
                 }",
            )
            .parse_function()
            .unwrap_err()
            .to_string(),
            "2: expected stack slot kind 'explicit_slot'"
        );
    }

    #[test]
    fn block_header() {
        let (func, _) = Parser::new(
            "function %blocks() {
                 block0:
                    jump block4
                 block4(v3: i32):
                    return
             }",
        )
        .parse_function()
        .unwrap();
        assert_eq!(func.name, "blocks");

        let mut blocks = func.layout.blocks();

        let block0 = blocks.next().unwrap();
        assert_eq!(func.dfg.block_params(block0), &[]);

        let block4 = blocks.next().unwrap();
        let block4_args = func.dfg.block_params(block4);
        assert_eq!(block4_args.len(), 1);
        assert_eq!(func.dfg.value_type(block4_args[0]), types::I32);

        // The forward jump was resolved.
        let jump = func.layout.first_inst(block0).unwrap();
        assert_eq!(func.dfg[jump].branch_destination(), Some(block4));
    }

    #[test]
    fn duplicate_block() {
        let c = Parser::new(
            "function %blocks() {
                block0:
                block0:
                    return 2",
        )
        .parse_function()
        .unwrap_err();

        assert_eq!(c.location.line_number, 3);
        assert_eq!(c.message, "duplicate entity: block0");
    }

    #[test]
    fn undefined_jump_target() {
        let c = Parser::new(
            "function %f() {
                block0:
                    jump block9
             }",
        )
        .parse_function()
        .unwrap_err();

        assert_eq!(c.location.line_number, 3);
        assert_eq!(c.message, "undefined reference: block9");
    }

    #[test]
    fn values_defined_before_use() {
        let c = Parser::new(
            "function %f(i32) -> i32 {
                block0(v0: i32):
                    v2 = iadd v0, v1
                    v1 = iconst.i32 1
                    return v2
             }",
        )
        .parse_function()
        .unwrap_err();
        assert_eq!(c.to_string(), "3: undefined value v1");

        // A value can't be its own operand.
        let c = Parser::new(
            "function %f(i32) -> i32 {
                block0(v0: i32):
                    v1 = imul v1, v0
                    return v1
             }",
        )
        .parse_function()
        .unwrap_err();
        assert_eq!(c.to_string(), "3: undefined value v1");
    }

    #[test]
    fn renumbering() {
        let (func, details) = Parser::new(
            "function %cubic(i32, i32) -> i32 {
                 ss7 = explicit_slot 4
             block3(v10: i32, v20: i32):
                 stack_store v10, ss7
                 v5 = stack_load.i32 ss7
                 v6 = iconst.i32 0xff
                 v4 = imul v5, v6
                 v30 = iadd v4, v20
                 return v30
             }",
        )
        .parse_function()
        .unwrap();

        assert_eq!(
            func.to_string(),
            "function %cubic(i32, i32) -> i32 {
    ss0 = explicit_slot 4

block0(v0: i32, v1: i32):
    stack_store v0, ss0
    v2 = stack_load.i32 ss0
    v3 = iconst.i32 255
    v4 = imul v2, v3
    v5 = iadd v4, v1
    return v5
}
"
        );
        assert_eq!(details.location.line_number, 1);
        assert_eq!(details.map.lookup_str("v30").unwrap().to_string(), "v5");
    }

    #[test]
    fn immediates_wrap_to_type() {
        let (func, _) = Parser::new(
            "function %f() -> i8 {
             block0:
                 v0 = iconst.i8 0xff
                 v1 = iconst.i8 -129
                 v2 = iadd v0, v1
                 return v2
             }",
        )
        .parse_function()
        .unwrap();
        let block0 = func.layout.entry_block().unwrap();
        let mut insts = func.layout.block_insts(block0);
        let v0 = func.dfg.first_result(insts.next().unwrap());
        let v1 = func.dfg.first_result(insts.next().unwrap());
        assert_eq!(func.dfg.iconst_value(v0), Some(-1));
        assert_eq!(func.dfg.iconst_value(v1), Some(127));

        assert_eq!(
            Parser::new("function %f() { block0: v0 = iconst.i32 0x1_0000_0000_0000_0000 }")
                .parse_function()
                .unwrap_err()
                .to_string(),
            "1: Too many hexadecimal digits"
        );
    }

    #[test]
    fn instruction_shapes() {
        let parse_err = |body: &str| {
            Parser::new(&format!(
                "function %f(i32) -> i32 {{\nblock0(v0: i32):\n{body}\n}}"
            ))
            .parse_function()
            .unwrap_err()
            .to_string()
        };
        assert_eq!(parse_err("iconst.i32 1"), "3: instruction iconst produces a result value");
        assert_eq!(parse_err("v1 = return v0"), "3: instruction return has no result value");
        assert_eq!(parse_err("v1 = iconst 1"), "3: iconst requires a type suffix, e.g. iconst.i32");
        assert_eq!(parse_err("v1 = iadd.i32 v0, v0"), "3: iadd does not take a type suffix '.i32'");
        assert_eq!(parse_err("v1 = fadd v0, v0"), "3: Unknown opcode: 'fadd'");
        assert_eq!(parse_err("v1 = stack_load.i32 ss0"), "3: undefined stack slot ss0");
        assert_eq!(parse_err("v1 = iadd v0 v0"), "3: expected ',' between operands");
    }

    #[test]
    fn comments() {
        let (func, Details { comments, .. }) = Parser::new(
            "; before
                         function %comment() { ; decl
                            ss10  = explicit_slot 13 ; stackslot.
                            ; Still stackslot.
                         block0: ; Basic block
                         v0 = iconst.i32 1 ; Instruction
                         } ; Trailing.
                         ; More trailing.",
        )
        .parse_function()
        .unwrap();
        assert_eq!(func.name, "comment");
        assert_eq!(comments.len(), 7); // no 'before' comment.
        assert_eq!(
            comments[0],
            Comment {
                entity: AnyEntity::Function,
                text: "; decl",
            }
        );
        assert_eq!(comments[1].entity.to_string(), "ss0");
        assert_eq!(comments[2].entity.to_string(), "ss0");
        assert_eq!(comments[2].text, "; Still stackslot.");
        assert_eq!(comments[3].entity.to_string(), "block0");
        assert_eq!(comments[3].text, "; Basic block");

        assert_eq!(comments[4].entity.to_string(), "inst0");
        assert_eq!(comments[4].text, "; Instruction");

        assert_eq!(comments[5].entity, AnyEntity::Function);
        assert_eq!(comments[6].entity, AnyEntity::Function);
    }

    #[test]
    fn trailing_comment_after_value_list() {
        let (_, Details { comments, .. }) = Parser::new(
            "function %f(i8) -> i8, i8 {
             block0(v0: i8):
                v1 = iadd v0, v0 ; add
                return v0, v1 ; ret
             }",
        )
        .parse_function()
        .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].entity.to_string(), "inst0");
        assert_eq!(comments[1].entity.to_string(), "inst1");
        assert_eq!(comments[1].text, "; ret");
    }

    #[test]
    fn test_file() {
        let tf = parse_test(
            r#"; before
                             test cube_fold
                             test interpret optimized
                             set opt_level=none
                             ; still preamble
                             function %comment() {}"#,
        )
        .unwrap();
        assert_eq!(tf.commands.len(), 2);
        assert_eq!(tf.commands[0].command, "cube_fold");
        assert_eq!(tf.commands[1].command, "interpret");
        assert!(tf.commands[1].has_flag("optimized"));
        assert_eq!(tf.flags.opt_level(), OptLevel::None);
        assert!(tf.flags.enable_verifier());
        assert_eq!(tf.preamble_comments.len(), 2);
        assert_eq!(tf.preamble_comments[0].text, "; before");
        assert_eq!(tf.preamble_comments[1].text, "; still preamble");
        assert_eq!(tf.functions.len(), 1);
        assert_eq!(tf.functions[0].0.name, "comment");
    }

    #[test]
    fn bad_settings() {
        assert_eq!(
            parse_test("set opt_level=fast\nfunction %f() {}")
                .unwrap_err()
                .to_string(),
            "1: invalid setting value for 'opt_level=fast', expected any among none, speed"
        );
    }

    #[test]
    fn invalid_character() {
        assert_eq!(
            parse_functions("function %f() {}\n$").unwrap_err().to_string(),
            "2: invalid character"
        );
        assert_eq!(
            parse_functions("function %f() {\nblock0:\n    return $\n}")
                .unwrap_err()
                .to_string(),
            "3: invalid character"
        );
    }

    #[test]
    fn run_commands() {
        let sig = Signature::new(vec![types::I32, types::I32], vec![types::I32]);
        let parse = |text: &str| parse_run_command(text, &sig);

        assert_eq!(parse("; check: v1 = iadd v0, v0"), Ok(None));
        assert_eq!(parse("; not a run command"), Ok(None));

        let run = parse("; run: %cubic(2, 3) == 125").unwrap().unwrap();
        assert_eq!(
            run,
            RunCommand::Run(
                Invocation::new("cubic", vec![2, 3]),
                Comparison::Equals,
                vec![125]
            )
        );
        assert_eq!(run.to_string(), "run: %cubic(2, 3) == 125");

        let run = parse(";run: %cubic(0xffffffff, -1) != [0]").unwrap().unwrap();
        assert_eq!(run.to_string(), "run: %cubic(-1, -1) != 0");

        let print = parse("; run: %cubic(1, 1)").unwrap().unwrap();
        assert_eq!(print, RunCommand::Print(Invocation::new("cubic", vec![1, 1])));
        let print = parse("; print: %cubic(1, 1)").unwrap().unwrap();
        assert_eq!(print.to_string(), "print: %cubic(1, 1)");

        let err = |text: &str| parse(text).unwrap_err().message;
        assert_eq!(err("; run: cubic(1, 1)"), "expected a function name, e.g. %my_fn");
        assert_eq!(err("; run: %cubic(1)"), "expected 2 argument values, found 1");
        assert_eq!(err("; run: %cubic(1, 2) = 3"), "expected another '='");
        assert_eq!(err("; run: %cubic(1, 2) : 3"), "unable to parse a valid comparison operator");
        assert_eq!(err("; run: %cubic(1, 2) < 3"), "invalid character");
        assert_eq!(err("; run: %cubic(1, 2) == [3, 4]"), "expected 1 return values, found 2");
        assert_eq!(err("; run: %cubic(1, 2) == 3 4"), "unexpected text after run command");
    }
}
