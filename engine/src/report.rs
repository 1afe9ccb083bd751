//! Structured reporting of simulation runs.
//!
//! Values are collected into one JSON object per program run.
//! Nesting follows RAII guards: `push_context` opens an object under a key,
//! `push_collection_context` an array whose items are opened with `push_collection_item`.
//! The whole object is printed to stdout when the guard returned by `enable_reporting` is dropped.
//! When reporting was never enabled on the current thread, everything here is a no-op,
//! so library code may report unconditionally.
//!
//! The reporter is thread local. Values reported from rayon workers end up nowhere.

use crate::built_info;
use serde_json::{Map, Value};
use std::cell::RefCell;

pub use serde_json::json;

#[derive(Debug)]
enum Frame {
    Object { key: Option<String>, entries: Map<String, Value> },
    Collection { key: String, items: Vec<Value> },
    Item { entries: Map<String, Value> },
}

#[derive(Debug)]
pub struct Reporter {
    frames: Vec<Frame>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter {
            frames: vec![Frame::Object { key: None, entries: Map::new() }],
        }
    }
}

impl Reporter {
    fn open(&mut self, frame: Frame) {
        match (self.frames.last(), &frame) {
            (Some(Frame::Collection { .. }), Frame::Item { .. }) => (),
            (Some(Frame::Collection { .. }), _) => panic!("only items can be opened in a collection"),
            (_, Frame::Item { .. }) => panic!("items can only be opened in a collection"),
            _ => (),
        }
        self.frames.push(frame);
    }

    fn report(&mut self, key: String, val: Value) {
        match self.frames.last_mut() {
            Some(Frame::Object { entries, .. }) | Some(Frame::Item { entries }) => {
                let prev = entries.insert(key, val);
                if !cfg!(feature = "report-allow-override") {
                    assert!(prev.is_none(), "value reported twice");
                }
            }
            _ => panic!("cannot report value on collection"),
        }
    }

    fn close(&mut self) {
        let frame = self.frames.pop().expect("tried to close the root context");
        let (key, val) = match frame {
            Frame::Object { key: Some(key), entries } => (Some(key), Value::Object(entries)),
            Frame::Object { key: None, .. } => panic!("tried to close the root context"),
            Frame::Collection { key, items } => (Some(key), Value::Array(items)),
            Frame::Item { entries } => (None, Value::Object(entries)),
        };
        match (self.frames.last_mut(), key) {
            (Some(Frame::Object { entries, .. }), Some(key)) | (Some(Frame::Item { entries }), Some(key)) => {
                let prev = entries.insert(key, val);
                assert_eq!(prev, None);
            }
            (Some(Frame::Collection { items, .. }), None) => items.push(val),
            _ => panic!("inconsistent context stack"),
        }
    }

    fn finish(&mut self) -> Value {
        assert_eq!(self.frames.len(), 1, "unclosed reporting contexts");
        match self.frames.pop() {
            Some(Frame::Object { key: None, entries }) => Value::Object(entries),
            _ => panic!("broken root object for reporting"),
        }
    }
}

thread_local! {
    static REPORTER: RefCell<Option<Reporter>> = RefCell::new(None);
}

fn with_reporter(f: impl FnOnce(&mut Reporter)) {
    REPORTER.with(|reporter| {
        if let Some(r) = reporter.borrow_mut().as_mut() {
            f(r)
        }
    });
}

#[must_use]
pub struct ContextGuard(());

impl Drop for ContextGuard {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

pub fn push_context(key: String) -> ContextGuard {
    with_reporter(|r| r.open(Frame::Object { key: Some(key), entries: Map::new() }));
    ContextGuard(())
}

#[must_use]
pub struct CollectionContextGuard(());

impl Drop for CollectionContextGuard {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

pub fn push_collection_context(key: String) -> CollectionContextGuard {
    with_reporter(|r| r.open(Frame::Collection { key, items: Vec::new() }));
    CollectionContextGuard(())
}

impl CollectionContextGuard {
    pub fn push_collection_item(&mut self) -> CollectionItemContextGuard {
        with_reporter(|r| r.open(Frame::Item { entries: Map::new() }));
        CollectionItemContextGuard(self)
    }
}

#[must_use]
pub struct CollectionItemContextGuard<'a>(&'a CollectionContextGuard);

impl<'a> Drop for CollectionItemContextGuard<'a> {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

pub fn report(key: String, val: Value) {
    if cfg!(feature = "report-to-stderr") {
        eprintln!("{}: {}", key, val);
    }
    report_silent(key, val)
}

pub fn report_silent(key: String, val: Value) {
    with_reporter(|r| r.report(key, val));
}

#[must_use]
pub struct ReportingGuard(());

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        let root = REPORTER.with(|reporter| reporter.borrow_mut().take().map(|mut r| r.finish()));
        if let Some(root) = root {
            println!("{}", root);
        }
    }
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { $crate::report::report($k.to_string(), $crate::report::json!($($json)+)) };
}

pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));

    report!("git_revision", built_info::GIT_VERSION.unwrap_or(""));
    report!("build_target", built_info::TARGET);
    report!("build_profile", built_info::PROFILE);
    report!("feature_flags", built_info::FEATURES_STR);
    report!("build_time", built_info::BUILT_TIME_UTC);
    report!("build_with_rustc", built_info::RUSTC_VERSION);

    if let Ok(hostname) = std::process::Command::new("hostname").output() {
        report!("hostname", String::from_utf8_lossy(&hostname.stdout).trim());
    }

    report!("program", program);
    report!("start_time", chrono::Utc::now().to_rfc2822());
    report!("args", std::env::args().collect::<Vec<String>>());

    ReportingGuard(())
}

pub mod benchmark;
pub use benchmark::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(f: impl FnOnce()) -> Value {
        REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));
        f();
        REPORTER.with(|reporter| reporter.borrow_mut().take().map(|mut r| r.finish())).unwrap()
    }

    #[test]
    fn nested_contexts() {
        let root = collect(|| {
            report!("samples", 10);
            {
                let _ctx = push_context("load".to_string());
                report!("segments", 3);
            }
            let mut runs = push_collection_context("runs".to_string());
            for i in 0..2 {
                let _item = runs.push_collection_item();
                report!("run", i);
            }
        });
        assert_eq!(root, json!({ "samples": 10, "load": { "segments": 3 }, "runs": [{ "run": 0 }, { "run": 1 }] }));
    }

    #[test]
    fn noop_without_reporter() {
        report!("nothing", 1);
        let _ctx = push_context("still_nothing".to_string());
    }
}
