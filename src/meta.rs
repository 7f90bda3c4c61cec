//! Typed heterogeneous metadata.
//!
//! A [`Meta`] maps [`Key<T>`]s to values of the key's type. Keys are
//! created at runtime and carry a process-unique id (which totally orders
//! them), a display name, and the printer and comparator for their value
//! type, so a `Meta` can be printed and compared without knowing the
//! types it holds. Two keys with the same name and type are still
//! distinct keys.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::errors::{Error, Result};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

fn next_key_id() -> u64 {
    let id = NEXT_KEY_ID.fetch_add(1, AtomicOrdering::Relaxed);
    // A wrapped counter would alias key ids.
    assert!(id != u64::MAX, "metadata key id space exhausted");
    id
}

type AnyVal = dyn Any + Send + Sync;

fn downcast<T: Any>(v: &AnyVal) -> &T {
    // Bindings are only ever created through the key whose closures carry
    // this downcast; a foreign value here is a bug, not user error.
    v.downcast_ref::<T>()
        .expect("metadata value stored under a foreign key")
}

struct KeyInfo {
    id: u64,
    name: String,
    pp: Box<dyn Fn(&AnyVal, &mut fmt::Formatter<'_>) -> fmt::Result + Send + Sync>,
    cmp: Box<dyn Fn(&AnyVal, &AnyVal) -> Ordering + Send + Sync>,
}

/// A typed metadata key.
pub struct Key<T> {
    info: Arc<KeyInfo>,
    _ty: PhantomData<fn(T) -> T>,
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Key {
            info: self.info.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}, id:{})", self.info.name, self.info.id)
    }
}

impl<T: Any + Send + Sync> Key<T> {
    /// Declares a fresh key with a value printer and comparator.
    pub fn new<P, C>(name: impl Into<String>, pp: P, cmp: C) -> Key<T>
    where
        P: Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result + Send + Sync + 'static,
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        let info = KeyInfo {
            id: next_key_id(),
            name: name.into(),
            pp: Box::new(move |v, f| pp(downcast::<T>(v), f)),
            cmp: Box::new(move |a, b| cmp(downcast::<T>(a), downcast::<T>(b))),
        };
        Key {
            info: Arc::new(info),
            _ty: PhantomData,
        }
    }

    /// Declares a fresh key for a type with an intrinsic order.
    pub fn with_ord(name: impl Into<String>) -> Key<T>
    where
        T: Ord + fmt::Debug,
    {
        Key::new(
            name,
            |v: &T, f: &mut fmt::Formatter<'_>| write!(f, "{:?}", v),
            |a: &T, b: &T| a.cmp(b),
        )
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Process-unique id; defines the total order over keys.
    pub fn id(&self) -> u64 {
        self.info.id
    }
}

#[derive(Clone)]
struct Binding {
    info: Arc<KeyInfo>,
    value: Arc<AnyVal>,
}

/// An immutable map from typed keys to values.
///
/// All operations return new maps; clones share bindings.
#[derive(Clone, Default)]
pub struct Meta {
    bindings: BTreeMap<u64, Binding>,
}

impl Meta {
    /// The empty map.
    pub fn new() -> Meta {
        Meta::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether `k` is bound.
    pub fn mem<T: Any + Send + Sync>(&self, k: &Key<T>) -> bool {
        self.bindings.contains_key(&k.info.id)
    }

    /// The map with `k` bound to `v`.
    pub fn add<T: Any + Send + Sync>(&self, k: &Key<T>, v: T) -> Meta {
        let mut bindings = self.bindings.clone();
        bindings.insert(
            k.info.id,
            Binding {
                info: k.info.clone(),
                value: Arc::new(v),
            },
        );
        Meta { bindings }
    }

    /// The map without `k`.
    pub fn rem<T: Any + Send + Sync>(&self, k: &Key<T>) -> Meta {
        let mut bindings = self.bindings.clone();
        bindings.remove(&k.info.id);
        Meta { bindings }
    }

    /// The value bound to `k`, if any.
    pub fn find<T: Any + Send + Sync>(&self, k: &Key<T>) -> Option<&T> {
        self.bindings.get(&k.info.id).map(|b| downcast(&*b.value))
    }

    /// The value bound to `k`; [`Error::UnboundKey`] when unbound.
    pub fn get<T: Any + Send + Sync>(&self, k: &Key<T>) -> Result<&T> {
        self.find(k).ok_or_else(|| Error::UnboundKey {
            name: k.info.name.clone(),
        })
    }

    /// Right-biased union: bindings of `other` win on conflicts.
    pub fn add_meta(&self, other: &Meta) -> Meta {
        let mut bindings = self.bindings.clone();
        for (id, b) in &other.bindings {
            bindings.insert(*id, b.clone());
        }
        Meta { bindings }
    }

    /// Total order: bindings are compared in key-id order, values through
    /// their key's comparator.
    pub fn compare(&self, other: &Meta) -> Ordering {
        let mut a = self.bindings.iter();
        let mut b = other.bindings.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some((ia, ba)), Some((ib, bb))) => {
                    let o = ia
                        .cmp(ib)
                        .then_with(|| (ba.info.cmp)(&*ba.value, &*bb.value));
                    if o != Ordering::Equal {
                        return o;
                    }
                }
            }
        }
    }
}

impl PartialEq for Meta {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, b) in self.bindings.values().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ", b.info.name)?;
            (b.info.pp)(&*b.value, f)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Meta{}", self)
    }
}

/// Standard document keys.
pub mod keys {
    use std::sync::LazyLock;

    use time::PrimitiveDateTime;

    use crate::math::V2;

    use super::Key;

    /// Rendering resolution, in samples per meter.
    pub static RESOLUTION: LazyLock<Key<V2>> = LazyLock::new(|| {
        Key::new(
            "resolution",
            |v: &V2, f: &mut std::fmt::Formatter<'_>| write!(f, "({} {})", v.x, v.y),
            |a: &V2, b: &V2| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)),
        )
    });

    pub static TITLE: LazyLock<Key<String>> = LazyLock::new(|| Key::with_ord("title"));

    pub static AUTHORS: LazyLock<Key<Vec<String>>> = LazyLock::new(|| Key::with_ord("authors"));

    pub static CREATOR: LazyLock<Key<String>> = LazyLock::new(|| Key::with_ord("creator"));

    pub static KEYWORDS: LazyLock<Key<Vec<String>>> = LazyLock::new(|| Key::with_ord("keywords"));

    pub static SUBJECT: LazyLock<Key<String>> = LazyLock::new(|| Key::with_ord("subject"));

    pub static DESCRIPTION: LazyLock<Key<String>> = LazyLock::new(|| Key::with_ord("description"));

    pub static CREATION_DATE: LazyLock<Key<PrimitiveDateTime>> =
        LazyLock::new(|| Key::with_ord("creation_date"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    #[test]
    fn add_then_get_round_trips() {
        let m = Meta::new().add(&keys::TITLE, "drawing".to_string());
        assert!(m.mem(&keys::TITLE));
        assert_eq!(m.get(&keys::TITLE).unwrap(), "drawing");
        assert_eq!(m.find(&keys::TITLE), Some(&"drawing".to_string()));
    }

    #[test]
    fn get_on_an_unbound_key_errors() {
        let m = Meta::new();
        match m.get(&keys::TITLE) {
            Err(Error::UnboundKey { name }) => assert_eq!(name, "title"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = Meta::new()
            .add(&keys::RESOLUTION, dvec2(300.0, 300.0))
            .add(&keys::TITLE, "x".to_string());
        let b = Meta::new()
            .add(&keys::TITLE, "x".to_string())
            .add(&keys::RESOLUTION, dvec2(300.0, 300.0));
        assert_eq!(a, b);
        assert_eq!(a.compare(&b), Ordering::Equal);
    }

    #[test]
    fn rem_removes_and_leaves_the_original_alone() {
        let a = Meta::new().add(&keys::TITLE, "x".to_string());
        let b = a.rem(&keys::TITLE);
        assert!(b.is_empty());
        assert!(a.mem(&keys::TITLE));
    }

    #[test]
    fn add_meta_is_right_biased() {
        let a = Meta::new()
            .add(&keys::TITLE, "left".to_string())
            .add(&keys::CREATOR, "c".to_string());
        let b = Meta::new().add(&keys::TITLE, "right".to_string());
        let u = a.add_meta(&b);
        assert_eq!(u.get(&keys::TITLE).unwrap(), "right");
        assert_eq!(u.get(&keys::CREATOR).unwrap(), "c");
        assert_eq!(u.len(), 2);
    }

    #[test]
    fn compare_is_a_total_order_consistent_with_eq() {
        let e = Meta::new();
        let a = Meta::new().add(&keys::TITLE, "a".to_string());
        let b = Meta::new().add(&keys::TITLE, "b".to_string());
        assert_eq!(e.compare(&a), Ordering::Less);
        assert_eq!(a.compare(&e), Ordering::Greater);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert!(a != b && a == a.clone());
    }

    #[test]
    fn keys_with_the_same_name_are_distinct() {
        let k1: Key<String> = Key::with_ord("title");
        let k2: Key<String> = Key::with_ord("title");
        assert_ne!(k1.id(), k2.id());
        let m = Meta::new().add(&k1, "v".to_string());
        assert!(m.mem(&k1));
        assert!(!m.mem(&k2));
    }

    #[test]
    fn key_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..100)
                        .map(|_| Key::<u32>::with_ord("burst").id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut ids = std::collections::HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(ids.insert(id), "duplicate key id {}", id);
            }
        }
        assert_eq!(ids.len(), 800);
    }

    #[test]
    fn display_prints_names_and_values() {
        let m = Meta::new()
            .add(&keys::TITLE, "x".to_string())
            .add(&keys::RESOLUTION, dvec2(300.0, 300.0));
        let s = m.to_string();
        assert!(s.contains("title: \"x\""), "{}", s);
        assert!(s.contains("resolution: (300 300)"), "{}", s);
    }

    #[test]
    fn creation_date_uses_calendar_and_clock() {
        use time::{Date, Month, PrimitiveDateTime, Time};
        let date = Date::from_calendar_date(2026, Month::August, 2).unwrap();
        let dt = PrimitiveDateTime::new(date, Time::from_hms(9, 30, 0).unwrap());
        let m = Meta::new().add(&keys::CREATION_DATE, dt);
        assert_eq!(m.get(&keys::CREATION_DATE).unwrap(), &dt);
    }
}
