//! Flattening a value graph into an object table.
//!
//! The table is built depth-first with an explicit stack. A container takes
//! its slot before any of its children, so the root is always object 0 and a
//! container reached again through the same `Arc` resolves to the slot it
//! already holds. Scalars are never shared: every occurrence gets its own
//! slot.

use super::value::Value;
use std::collections::HashMap;

/// One object table slot.
#[derive(Debug, PartialEq)]
pub(crate) enum Entry<'a> {
    /// Scalar value, written verbatim
    Scalar(&'a Value),
    /// Dictionary key
    Key(&'a str),
    /// Array member indices
    Array(Vec<u64>),
    /// Set member indices
    Set(Vec<u64>),
    /// Parallel key and value indices
    Dictionary { keys: Vec<u64>, values: Vec<u64> },
}

#[derive(Clone, Copy)]
enum Child<'a> {
    Key(&'a str),
    Value(&'a Value),
}

/// A container whose children are still being flattened.
struct Frame<'a> {
    slot: usize,
    children: Vec<Child<'a>>,
    refs: Vec<u64>,
}

/// Flatten `root` into an object table whose first entry is the root.
pub(crate) fn flatten(root: &Value) -> Vec<Entry<'_>> {
    let mut flattener = Flattener {
        entries: Vec::new(),
        seen: HashMap::new(),
    };
    flattener.run(root);
    flattener.entries
}

struct Flattener<'a> {
    entries: Vec<Entry<'a>>,
    /// Container identity to assigned index
    seen: HashMap<usize, u64>,
}

impl<'a> Flattener<'a> {
    fn run(&mut self, root: &'a Value) {
        let mut stack = Vec::new();
        if let (_, Some(frame)) = self.visit(Child::Value(root)) {
            stack.push(frame);
        }

        while let Some(mut frame) = stack.pop() {
            match frame.children.get(frame.refs.len()).copied() {
                Some(child) => {
                    let (index, nested) = self.visit(child);
                    frame.refs.push(index);
                    stack.push(frame);
                    if let Some(nested) = nested {
                        stack.push(nested);
                    }
                }
                None => self.finish(frame),
            }
        }
    }

    /// Assign an index to `child`, returning a frame if it is a new container.
    fn visit(&mut self, child: Child<'a>) -> (u64, Option<Frame<'a>>) {
        let value = match child {
            Child::Key(key) => return (self.push(Entry::Key(key)), None),
            Child::Value(value) => value,
        };

        let Some(identity) = value.identity() else {
            return (self.push(Entry::Scalar(value)), None);
        };

        if let Some(&index) = self.seen.get(&identity) {
            return (index, None);
        }

        let (placeholder, children) = match value {
            Value::Array(items) => (
                Entry::Array(Vec::new()),
                items.iter().map(Child::Value).collect(),
            ),
            Value::Set(items) => (
                Entry::Set(Vec::new()),
                items.iter().map(Child::Value).collect(),
            ),
            Value::Dictionary(dict) => (
                Entry::Dictionary {
                    keys: Vec::new(),
                    values: Vec::new(),
                },
                dict.iter()
                    .flat_map(|(k, v)| [Child::Key(k.as_ref()), Child::Value(v)])
                    .collect::<Vec<_>>(),
            ),
            _ => return (self.push(Entry::Scalar(value)), None),
        };

        let slot = self.entries.len();
        let index = self.push(placeholder);
        self.seen.insert(identity, index);

        let frame = Frame {
            slot,
            refs: Vec::with_capacity(children.len()),
            children,
        };
        (index, Some(frame))
    }

    /// Back-fill a container's indices once all children have slots.
    fn finish(&mut self, frame: Frame<'a>) {
        match &mut self.entries[frame.slot] {
            Entry::Array(members) | Entry::Set(members) => *members = frame.refs,
            Entry::Dictionary { keys, values } => {
                for pair in frame.refs.chunks_exact(2) {
                    keys.push(pair[0]);
                    values.push(pair[1]);
                }
            }
            Entry::Scalar(_) | Entry::Key(_) => {}
        }
    }

    fn push(&mut self, entry: Entry<'a>) -> u64 {
        self.entries.push(entry);
        (self.entries.len() - 1) as u64
    }
}
