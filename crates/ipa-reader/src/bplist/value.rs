//! Property list value model.
//!
//! [`Value`] is a closed union over everything a property list can hold.
//! Payloads are stored behind [`Arc`] so that one object can appear in
//! several places of a graph: the encoder writes a shared container once,
//! and the decoder hands out the same `Arc` for every reference to one
//! object, whether it is a container, a string or a blob. Equality is
//! structural.
//!
//! Dropping a value releases nested containers with a worklist, so a deeply
//! nested graph is freed without recursion.

use super::constants::PLIST_EPOCH_UNIX_OFFSET;
use super::error::Error;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Dictionary payload, keyed by string.
pub type Dictionary = BTreeMap<Arc<str>, Value>;

/// A property list value.
///
/// # Examples
///
/// ```
/// use ipa_reader::Value;
///
/// let info = Value::dictionary([
///     ("CFBundleIdentifier", Value::from("com.example.app")),
///     ("UIDeviceFamily", Value::array([Value::from(1), Value::from(2)])),
/// ]);
///
/// let dict = info.as_dictionary().unwrap();
/// assert_eq!(dict["CFBundleIdentifier"].as_string(), Some("com.example.app"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(Integer),
    Real(f64),
    Date(Date),
    Data(Arc<[u8]>),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    /// Unordered collection; encounter order is kept but carries no meaning.
    Set(Arc<Vec<Value>>),
    Dictionary(Arc<Dictionary>),
}

impl Value {
    /// Build an array from any sequence of values.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    /// Build a set from any sequence of values.
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Set(Arc::new(items.into_iter().collect()))
    }

    /// Build a dictionary from key/value pairs.
    pub fn dictionary<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<Arc<str>>,
    {
        Value::Dictionary(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Value::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Date(_) => "date",
            Value::Data(_) => "data",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
            Value::Dictionary(_) => "dictionary",
        }
    }

    /// Move the members of a uniquely owned container into `pending`.
    ///
    /// Shared containers are left alone; their last owner releases them.
    fn take_members(&mut self, pending: &mut Vec<Value>) {
        match self {
            Value::Array(items) | Value::Set(items) => {
                if let Some(items) = Arc::get_mut(items) {
                    pending.append(items);
                }
            }
            Value::Dictionary(dict) => {
                if let Some(dict) = Arc::get_mut(dict) {
                    pending.extend(std::mem::take(dict).into_values());
                }
            }
            _ => {}
        }
    }

    /// Address of the shared container allocation, `None` for scalars.
    ///
    /// Two values with the same identity are the same instance.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(items) | Value::Set(items) => {
                Some(Arc::as_ptr(items) as *const () as usize)
            }
            Value::Dictionary(dict) => Some(Arc::as_ptr(dict) as *const () as usize),
            _ => None,
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_members(&mut pending);
        // Each popped value is emptied before it drops, so its own drop is shallow.
        while let Some(mut value) = pending.pop() {
            value.take_members(&mut pending);
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Data(Arc::from(data))
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::Data(Arc::from(data))
    }
}

impl From<Date> for Value {
    fn from(date: Date) -> Self {
        Value::Date(date)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dictionary(Arc::new(dict))
    }
}

impl From<Integer> for Value {
    fn from(i: Integer) -> Self {
        Value::Integer(i)
    }
}

/// Signed integer of up to 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Integer(i128);

impl Integer {
    /// The full value.
    pub fn value(self) -> i128 {
        self.0
    }

    /// The value as `i64`, if it fits.
    pub fn as_signed(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    /// The value as `u64`, if it fits.
    pub fn as_unsigned(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(i: $t) -> Self {
                    Integer(i as i128)
                }
            }

            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Integer(Integer(i as i128))
                }
            }
        )*
    };
}

integer_from!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl TryFrom<u128> for Integer {
    type Error = Error;

    fn try_from(i: u128) -> Result<Self, Error> {
        i128::try_from(i)
            .map(Integer)
            .map_err(|_| Error::Size(format!("{i} exceeds the signed 128-bit range")))
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An instant in time.
///
/// Binary plists store dates as a double of seconds relative to
/// 2001-01-01T00:00:00Z. `Date` holds exactly that number, so a date always
/// survives an encode and decode unchanged; converting from [`SystemTime`]
/// rounds to the nearest representable double.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Date(f64);

impl Date {
    /// Build a date from seconds since 2001-01-01T00:00:00Z.
    ///
    /// Returns `None` for NaN or infinite input.
    pub fn from_plist_seconds(seconds: f64) -> Option<Self> {
        seconds.is_finite().then_some(Date(seconds))
    }

    /// Seconds since 2001-01-01T00:00:00Z.
    pub fn to_plist_seconds(self) -> f64 {
        self.0
    }

    /// The instant on the platform clock, `None` if it cannot represent it.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let unix = self.0 + PLIST_EPOCH_UNIX_OFFSET;
        if unix >= 0.0 {
            UNIX_EPOCH.checked_add(Duration::try_from_secs_f64(unix).ok()?)
        } else {
            UNIX_EPOCH.checked_sub(Duration::try_from_secs_f64(-unix).ok()?)
        }
    }
}

impl From<SystemTime> for Date {
    fn from(time: SystemTime) -> Self {
        let unix = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_secs_f64(),
            Err(before) => -before.duration().as_secs_f64(),
        };
        Date(unix - PLIST_EPOCH_UNIX_OFFSET)
    }
}
