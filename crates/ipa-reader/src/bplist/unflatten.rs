//! Resolving decoded index lists into values.
//!
//! Objects are resolved with an explicit worklist so deeply nested input
//! cannot exhaust the stack. Every index is decoded at most once per call;
//! later references receive a clone of the cached value, which shares the
//! same `Arc` payload. Decoded memory therefore stays proportional to the
//! input, however often one object is referenced.

use super::decode::{Object, ObjectReader};
use super::error::Error;
use super::value::{Dictionary, Value};
use super::Result;
use std::collections::HashMap;
use std::sync::Arc;

enum Slot {
    Unvisited,
    /// Container whose members are still being resolved
    InProgress,
    Done(Value),
}

#[derive(Clone, Copy)]
enum Kind {
    Array,
    Set,
    Dictionary { len: usize },
}

/// A container waiting for its members.
struct Frame {
    index: u64,
    kind: Kind,
    /// Member indices; for dictionaries all keys, then all values
    refs: Vec<u64>,
    resolved: Vec<Value>,
}

enum Step {
    Ready(Value),
    Descend(Frame),
}

/// Decode the root object of `reader` and everything reachable from it.
pub(crate) fn unflatten(reader: &ObjectReader<'_>) -> Result<Value> {
    let mut slots = Vec::new();
    // Trailer validation bounds the count by the buffer length.
    slots.resize_with(reader.object_count() as usize, || Slot::Unvisited);

    let mut unflattener = Unflattener {
        reader,
        slots,
        rendered_keys: HashMap::new(),
    };
    unflattener.resolve(reader.root())
}

struct Unflattener<'r, 'a> {
    reader: &'r ObjectReader<'a>,
    slots: Vec<Slot>,
    /// Text of non-string keys, by object index
    rendered_keys: HashMap<u64, Arc<str>>,
}

impl Unflattener<'_, '_> {
    fn resolve(&mut self, root: u64) -> Result<Value> {
        let mut stack = match self.enter(root)? {
            Step::Ready(value) => return Ok(value),
            Step::Descend(frame) => vec![frame],
        };

        while let Some(mut frame) = stack.pop() {
            match frame.refs.get(frame.resolved.len()).copied() {
                Some(child) => match self.enter(child)? {
                    Step::Ready(value) => {
                        frame.resolved.push(value);
                        stack.push(frame);
                    }
                    Step::Descend(nested) => {
                        stack.push(frame);
                        stack.push(nested);
                    }
                },
                None => {
                    let index = frame.index;
                    let value = self.finish(frame)?;
                    self.slots[index as usize] = Slot::Done(value.clone());

                    match stack.last_mut() {
                        Some(parent) => parent.resolved.push(value),
                        None => return Ok(value),
                    }
                }
            }
        }

        Err(Error::Format(format!("object {root} did not resolve")))
    }

    /// Start resolving object `index`.
    fn enter(&mut self, index: u64) -> Result<Step> {
        let slot = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.slots.len())
            .ok_or_else(|| {
                Error::Format(format!(
                    "object reference {index} outside {} objects",
                    self.slots.len()
                ))
            })?;

        match &self.slots[slot] {
            Slot::Done(value) => return Ok(Step::Ready(value.clone())),
            Slot::InProgress => {
                return Err(Error::Format(format!(
                    "object {index} contains itself"
                )))
            }
            Slot::Unvisited => {}
        }

        let (kind, refs) = match self.reader.read_object(index)? {
            Object::Scalar(value) => {
                self.slots[slot] = Slot::Done(value.clone());
                return Ok(Step::Ready(value));
            }
            Object::Array(refs) => (Kind::Array, refs),
            Object::Set(refs) => (Kind::Set, refs),
            Object::Dictionary { mut keys, values } => {
                let len = keys.len();
                keys.extend(values);
                (Kind::Dictionary { len }, keys)
            }
        };

        self.slots[slot] = Slot::InProgress;
        Ok(Step::Descend(Frame {
            index,
            kind,
            resolved: Vec::with_capacity(refs.len()),
            refs,
        }))
    }

    fn finish(&mut self, frame: Frame) -> Result<Value> {
        let Frame {
            index,
            kind,
            refs,
            mut resolved,
        } = frame;

        match kind {
            Kind::Array => Ok(Value::Array(Arc::new(resolved))),
            Kind::Set => Ok(Value::Set(Arc::new(resolved))),
            Kind::Dictionary { len } => {
                let values = resolved.split_off(len);
                let mut dict = Dictionary::new();
                for ((&key_index, key), value) in refs.iter().zip(&resolved).zip(values) {
                    dict.insert(self.key_text(key_index, key, index)?, value);
                }
                Ok(Value::Dictionary(Arc::new(dict)))
            }
        }
    }

    /// Dictionary keys are strings; numeric and boolean keys are rendered as
    /// text once per object.
    fn key_text(&mut self, index: u64, key: &Value, dict: u64) -> Result<Arc<str>> {
        if let Value::String(s) = key {
            return Ok(Arc::clone(s));
        }
        if let Some(text) = self.rendered_keys.get(&index) {
            return Ok(Arc::clone(text));
        }

        let text: Arc<str> = match key {
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Boolean(b) => b.to_string(),
            other => {
                return Err(Error::Format(format!(
                    "dictionary {dict} has a {} key",
                    other.type_name()
                )))
            }
        }
        .into();
        self.rendered_keys.insert(index, Arc::clone(&text));
        Ok(text)
    }
}
