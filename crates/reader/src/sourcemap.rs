//! Source map associating entities with their source locations.
//!
//! When the parser reads in a source file, it reads a number of entity references like `v5` or
//! `block2`. The parsed function gets new entity numbers: values and blocks are renumbered in
//! definition order. The `SourceMap` records the mapping from source names to the final entity
//! references, so test commands can refer to entities by the names used in the source.

use crate::error::{Location, ParseResult};
use crate::lexer::split_entity_name;
use cubefold_codegen::ir::entities::AnyEntity;
use cubefold_codegen::ir::{Block, StackSlot, Value};
use std::collections::HashMap;

/// Mapping from entity names to source locations.
#[derive(Debug, Default)]
pub struct SourceMap {
    // Store locations for entities, including instructions.
    locations: HashMap<AnyEntity, Location>,

    values: HashMap<Value, Value>,
    blocks: HashMap<Block, Block>,
    stack_slots: HashMap<u32, StackSlot>,
}

/// Read-only interface which is exposed outside the parser crate.
impl SourceMap {
    /// Look up a value entity by its source number.
    pub fn get_value(&self, src: Value) -> Option<Value> {
        self.values.get(&src).copied()
    }

    /// Look up a block entity by its source number.
    pub fn get_block(&self, src: Block) -> Option<Block> {
        self.blocks.get(&src).copied()
    }

    /// Look up a stack slot entity by its source number.
    pub fn get_ss(&self, src_num: u32) -> Option<StackSlot> {
        self.stack_slots.get(&src_num).copied()
    }

    /// Look up an entity by source name.
    /// Returns the entity reference corresponding to `name`, if it exists.
    pub fn lookup_str(&self, name: &str) -> Option<AnyEntity> {
        split_entity_name(name).and_then(|(ent, num)| match ent {
            "v" => Value::with_number(num)
                .and_then(|v| self.get_value(v))
                .map(AnyEntity::Value),
            "block" => Block::with_number(num)
                .and_then(|b| self.get_block(b))
                .map(AnyEntity::Block),
            "ss" => self.get_ss(num).map(AnyEntity::StackSlot),
            _ => None,
        })
    }

    /// Get the source location where an entity was defined.
    pub fn location(&self, entity: AnyEntity) -> Option<Location> {
        self.locations.get(&entity).copied()
    }
}

impl SourceMap {
    /// Rewrite a block reference written with its source number.
    pub(crate) fn rewrite_block(&self, block: &mut Block, loc: AnyEntity) -> ParseResult<()> {
        match self.get_block(*block) {
            Some(new) => {
                *block = new;
                Ok(())
            }
            None => err!(
                self.location(loc).unwrap_or_default(),
                "undefined reference: {}",
                block
            ),
        }
    }

    /// Create a new empty `SourceMap`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the value `entity`, written as `src` in the source.
    pub fn def_value(&mut self, src: Value, entity: Value, loc: Location) -> ParseResult<()> {
        if self.values.insert(src, entity).is_some() {
            err!(loc, "duplicate entity: {}", src)
        } else {
            self.def_entity(entity.into(), loc)
        }
    }

    /// Define the block `entity`, written as `src` in the source.
    pub fn def_block(&mut self, src: Block, entity: Block, loc: Location) -> ParseResult<()> {
        if self.blocks.insert(src, entity).is_some() {
            err!(loc, "duplicate entity: {}", src)
        } else {
            self.def_entity(entity.into(), loc)
        }
    }

    /// Define the stack slot `entity`, written as `ss{src_num}` in the source.
    pub fn def_ss(&mut self, src_num: u32, entity: StackSlot, loc: Location) -> ParseResult<()> {
        if self.stack_slots.insert(src_num, entity).is_some() {
            err!(loc, "duplicate entity: ss{}", src_num)
        } else {
            self.def_entity(entity.into(), loc)
        }
    }

    /// Define an entity. This can be used for instructions whose numbers never
    /// appear in source, or implicitly defined signatures.
    pub fn def_entity(&mut self, entity: AnyEntity, loc: Location) -> ParseResult<()> {
        if self.locations.insert(entity, loc).is_some() {
            err!(loc, "duplicate entity: {}", entity)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ParseError, parse_test};
    use cubefold_codegen::ir::entities::AnyEntity;

    #[test]
    fn details() {
        let tf = parse_test(
            "function %detail(i32) {
                                ss10 = explicit_slot 4
                             block4(v4: i32):
                                v7 = iconst.i32 7
                                stack_store v4, ss10
                                jump block7
                             block7:
                                v3 = stack_load.i32 ss10
                                return
                             }",
        )
        .unwrap();
        let map = &tf.functions[0].1.map;

        assert_eq!(map.lookup_str("v0"), None);
        assert_eq!(map.lookup_str("ss1"), None);
        assert_eq!(map.lookup_str("ss10").unwrap().to_string(), "ss0");
        assert_eq!(map.lookup_str("block0"), None);
        assert_eq!(map.lookup_str("block4").unwrap().to_string(), "block0");
        assert_eq!(map.lookup_str("block7").unwrap().to_string(), "block1");
        assert_eq!(map.lookup_str("v4").unwrap().to_string(), "v0");
        assert_eq!(map.lookup_str("v7").unwrap().to_string(), "v1");
        assert_eq!(map.lookup_str("v3").unwrap().to_string(), "v2");

        let v2 = map.lookup_str("v3").unwrap();
        assert_eq!(map.location(v2).unwrap().line_number, 8);
        assert_eq!(map.location(AnyEntity::Function), None);
    }

    #[test]
    fn duplicates() {
        let e = parse_test(
            "function %dup(i32) {
             block0(v0: i32):
                v0 = iconst.i32 1
                return
             }",
        )
        .unwrap_err();
        assert_eq!(
            e,
            ParseError::new(crate::Location { line_number: 3 }, "duplicate entity: v0")
        );
    }
}
