//! Scripted in-memory page used by the integration tests.
//!
//! Nodes live in an arena and match a selector when one of their labels is
//! the selector's exact text, so tests write `"div.card"` both in the store
//! YAML and on the node. Document heights are replayed from a list, the last
//! value repeating once the list runs out.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use canasta_core::{parse_stores, Selector, StoreConfig};
use canasta_scraper::{PageDriver, ScraperError};
use serde_json::{json, Value};

pub const HEIGHT_SCRIPT: &str = "return document.body.scrollHeight;";
pub const SCROLL_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

#[derive(Debug, Default)]
struct Node {
    labels: Vec<String>,
    attrs: HashMap<String, String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Default)]
pub struct FakePage {
    nodes: Vec<Node>,
    /// Selectors that `wait_for`/`is_visible`/`click` treat as present even
    /// without a node.
    present: HashSet<String>,
    heights: Vec<Value>,
    height_reads: Mutex<usize>,
    fail_goto: bool,
    fail_height_after: Option<usize>,
    fail_clicks: HashSet<String>,
    fail_attributes: HashSet<String>,
    commands: Mutex<Vec<String>>,
    closed: Arc<AtomicBool>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            heights: vec![json!(1000)],
            ..Self::default()
        }
    }

    /// Adds a node and returns its id.
    pub fn add(
        &mut self,
        parent: Option<usize>,
        labels: &[&str],
        attrs: &[(&str, &str)],
        text: &str,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            labels: labels.iter().map(ToString::to_string).collect(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            text: text.to_string(),
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    pub fn show(&mut self, selector: &str) {
        self.present.insert(selector.to_string());
    }

    pub fn with_heights(mut self, heights: &[u64]) -> Self {
        self.heights = heights.iter().map(|h| json!(h)).collect();
        self
    }

    pub fn with_raw_heights(mut self, heights: Vec<Value>) -> Self {
        self.heights = heights;
        self
    }

    pub fn fail_goto(&mut self) {
        self.fail_goto = true;
    }

    /// Height reads after the first `n` fail.
    pub fn fail_height_after(&mut self, n: usize) {
        self.fail_height_after = Some(n);
    }

    pub fn fail_click(&mut self, selector: &str) {
        self.fail_clicks.insert(selector.to_string());
    }

    pub fn fail_attribute(&mut self, name: &str) {
        self.fail_attributes.insert(name.to_string());
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }

    fn log(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    fn matches(&self, id: usize, selector: &Selector) -> bool {
        self.nodes[id].labels.iter().any(|l| l == selector.as_str())
    }

    fn is_present(&self, selector: &Selector) -> bool {
        self.present.contains(selector.as_str())
            || (0..self.nodes.len()).any(|id| self.matches(id, selector))
    }

    fn first_descendant(&self, id: usize, selector: &Selector) -> Option<usize> {
        for &child in &self.nodes[id].children {
            if self.matches(child, selector) {
                return Some(child);
            }
            if let Some(found) = self.first_descendant(child, selector) {
                return Some(found);
            }
        }
        None
    }

    fn full_text(&self, id: usize) -> String {
        let node = &self.nodes[id];
        let mut parts = vec![node.text.clone()];
        parts.extend(node.children.iter().map(|&c| self.full_text(c)));
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn next_height(&self) -> Result<Value, ScraperError> {
        let mut reads = self.height_reads.lock().unwrap();
        if self.fail_height_after.is_some_and(|n| *reads >= n) {
            return Err(ScraperError::Driver("page crashed".to_string()));
        }
        let value = self
            .heights
            .get(*reads)
            .or_else(|| self.heights.last())
            .cloned()
            .unwrap_or(Value::Null);
        *reads += 1;
        Ok(value)
    }
}

impl PageDriver for FakePage {
    type Element = usize;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        self.log(format!("goto:{url}"));
        if self.fail_goto {
            return Err(ScraperError::Timeout {
                target: url.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            });
        }
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), ScraperError> {
        if self.is_present(selector) {
            Ok(())
        } else {
            Err(ScraperError::Timeout {
                target: selector.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            })
        }
    }

    async fn click(&self, selector: &Selector) -> Result<(), ScraperError> {
        self.log(format!("click:{selector}"));
        if self.fail_clicks.contains(selector.as_str()) {
            return Err(ScraperError::Driver("element click intercepted".to_string()));
        }
        if !self.is_present(selector) {
            return Err(ScraperError::NotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<(), ScraperError> {
        if !self.is_present(selector) {
            return Err(ScraperError::NotFound {
                selector: selector.to_string(),
            });
        }
        self.log(format!("fill:{selector}={text}"));
        Ok(())
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool, ScraperError> {
        Ok(self.is_present(selector))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ScraperError> {
        if script == HEIGHT_SCRIPT {
            return self.next_height();
        }
        self.log(format!("script:{script}"));
        Ok(Value::Null)
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<usize>, ScraperError> {
        Ok((0..self.nodes.len())
            .filter(|&id| self.matches(id, selector))
            .collect())
    }

    async fn find_within(
        &self,
        element: &usize,
        selector: &Selector,
    ) -> Result<Option<usize>, ScraperError> {
        Ok(self.first_descendant(*element, selector))
    }

    async fn text(&self, element: &usize) -> Result<String, ScraperError> {
        Ok(self.full_text(*element))
    }

    async fn attribute(&self, element: &usize, name: &str) -> Result<Option<String>, ScraperError> {
        if self.fail_attributes.contains(name) {
            return Err(ScraperError::Driver(format!("stale element reading {name}")));
        }
        Ok(self.nodes[*element].attrs.get(name).cloned())
    }

    async fn closest(
        &self,
        element: &usize,
        selector: &Selector,
    ) -> Result<Option<usize>, ScraperError> {
        let mut current = self.nodes[*element].parent;
        while let Some(id) = current {
            if self.matches(id, selector) {
                return Ok(Some(id));
            }
            current = self.nodes[id].parent;
        }
        Ok(None)
    }

    async fn close(self) -> Result<(), ScraperError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Parses a single store entry written at the indentation of a list item
/// under `stores:`.
pub fn store_from_yaml(entry: &str) -> StoreConfig {
    let doc = format!("stores:\n{entry}");
    parse_stores(&doc)
        .expect("test store should validate")
        .stores
        .remove(0)
}
