//! Test runner.
//!
//! This module implements the `TestRunner` struct which manages executing tests as well as
//! scanning directories for tests.

use crate::runone;
use cubefold_codegen::timing;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time;
use walkdir::WalkDir;

/// The result of running the test in a file.
type TestResult = anyhow::Result<time::Duration>;

struct QueueEntry {
    path: PathBuf,
    state: State,
}

#[derive(Debug)]
enum State {
    New,
    Done(TestResult),
}

impl QueueEntry {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

pub struct TestRunner {
    verbose: bool,

    // Should we print the timings out?
    report_times: bool,

    // Directories that have not yet been scanned.
    dir_stack: Vec<PathBuf>,

    // Filenames of tests to run.
    tests: Vec<QueueEntry>,

    // Pointer into `tests` where the `New` entries begin.
    new_tests: usize,

    errors: usize,
}

impl TestRunner {
    /// Create a new blank TestRunner.
    pub fn new(verbose: bool, report_times: bool) -> Self {
        Self {
            verbose,
            report_times,
            dir_stack: Vec::new(),
            tests: Vec::new(),
            new_tests: 0,
            errors: 0,
        }
    }

    /// Add a directory path to be scanned later.
    ///
    /// If `dir` turns out to be a regular file, it is silently ignored.
    /// Otherwise, any problems reading the directory are reported.
    pub fn push_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.dir_stack.push(dir.into());
    }

    /// Add a test to be executed later.
    ///
    /// Any problems reading `file` as a test case file will be reported as a test failure.
    pub fn push_test<P: Into<PathBuf>>(&mut self, file: P) {
        self.tests.push(QueueEntry {
            path: file.into(),
            state: State::New,
        });
    }

    /// Take a new test for running as a job.
    fn take_job(&mut self) -> Option<usize> {
        let jobid = self.new_tests;
        if jobid == self.tests.len() {
            return None;
        }
        self.new_tests += 1;
        Some(jobid)
    }

    /// Report the end of a job.
    fn finish_job(&mut self, jobid: usize, result: TestResult) {
        match result {
            Ok(duration) if self.verbose => {
                println!(
                    "PASS {} ({:.3}s)",
                    self.tests[jobid].path.display(),
                    duration.as_secs_f64()
                );
            }
            Ok(_) => {}
            Err(ref e) => self.job_error(jobid, e),
        }
        self.tests[jobid].state = State::Done(result);
    }

    /// Scan any directories pushed so far.
    /// Push any potential test cases found.
    pub fn scan_dirs(&mut self) {
        // Entries with an "ir" extension are test case files, hidden entries are skipped, and
        // the walk itself descends into subdirectories.
        while let Some(dir) = self.dir_stack.pop() {
            let walker = WalkDir::new(&dir)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_hidden(e.file_name()));
            for entry in walker {
                match entry {
                    Err(err) => {
                        let path = err.path().unwrap_or(&dir).to_path_buf();
                        self.path_error(&path, &err);
                    }
                    Ok(entry) => {
                        if entry.file_type().is_file()
                            && entry.path().extension() == Some(OsStr::new("ir"))
                        {
                            self.push_test(entry.into_path());
                        }
                    }
                }
            }
            // Get the new jobs running before moving on to the next directory.
            self.schedule_jobs();
        }
    }

    /// Report an error related to a path.
    fn path_error(&mut self, path: &Path, err: &dyn fmt::Display) {
        self.errors += 1;
        println!("{}: {}", path.display(), err);
    }

    /// Report an error related to a job.
    fn job_error(&mut self, jobid: usize, err: &anyhow::Error) {
        self.errors += 1;
        println!("FAIL {}: {:?}", self.tests[jobid].path.display(), err);
    }

    /// Schedule any new jobs to run.
    fn schedule_jobs(&mut self) {
        while let Some(jobid) = self.take_job() {
            let result = runone::run(self.tests[jobid].path());
            self.finish_job(jobid, result);
        }
    }

    /// Scan pushed directories for tests and run them.
    pub fn run(&mut self) -> TestResult {
        let started = time::Instant::now();
        self.scan_dirs();
        self.schedule_jobs();

        if self.report_times {
            print!("{}", timing::take_current());
        }

        let passed = self
            .tests
            .iter()
            .filter(|t| matches!(t.state, State::Done(Ok(_))))
            .count();
        println!("{} tests, {} passed", self.tests.len(), passed);
        match self.errors {
            0 => Ok(started.elapsed()),
            1 => anyhow::bail!("1 failure"),
            n => anyhow::bail!("{} failures", n),
        }
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.') && s != "." && s != "..")
}
