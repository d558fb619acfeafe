/*! Typed side-data attachable to any model entity.

Every entity of the model carries an [ExtensionSet] in which other
subsystems (generators, analysis importers, visualization front-ends)
deposit data without the entity's type having to know about it. Each
concrete extension type gets its own bucket, so several independent
annotations coexist on one entity; within a bucket, multi-valued storage
is intentional (profiles and jitter constraints are naturally
multi-valued, analysis results are not and overwrite themselves).

Concrete types implement [ExtensionData] — a `Clone + Debug` payload plus
a [Category] — and the blanket impl lifts them into the object-safe
[Extension] trait. The category is the "abstract capability" key: callers
that only know *what kind* of annotation they are after (say, any timing
constraint) query by category instead of by concrete type.
*/

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

pub mod standard;


/// Capability tag shared by all extension types of one kind.
///
/// Distinct concrete types may carry the same category; category queries
/// scan every bucket whose entries claim it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Category(pub &'static str);

/// Object-safe face of an extension instance.
///
/// Do not implement this directly; implement [ExtensionData] and let the
/// blanket impl provide the plumbing.
pub trait Extension: Any + fmt::Debug {
    /// The capability this extension belongs to.
    fn category(&self) -> Category;
    /// Clone behind the trait object.
    fn clone_boxed(&self) -> Box<dyn Extension>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A concrete extension payload.
pub trait ExtensionData: Any + fmt::Debug + Clone {
    /// Capability tag of this type.
    const CATEGORY: Category;
}

impl<T: ExtensionData> Extension for T {
    fn category(&self) -> Category {
        T::CATEGORY
    }

    fn clone_boxed(&self) -> Box<dyn Extension> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// How an [ExtensionSet::attach] call treats existing entries of the
/// same concrete type.
///
/// With neither `overwrite` nor `ignore_if_present` set, old and new
/// values coexist (multi-valued bucket).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttachOptions {
    /// Keep this extension when the owning entity is cloned.
    pub clone_on_copy: bool,
    /// Drop all existing entries of this type first.
    pub overwrite: bool,
    /// Do nothing if an entry of this type already exists.
    pub ignore_if_present: bool,
}

#[derive(Debug)]
struct Slot {
    ext: Box<dyn Extension>,
    clone_on_copy: bool,
}

/// Per-entity store of extension instances, bucketed by concrete type.
///
/// Buckets remember their creation order, so category scans and removals
/// are deterministic across runs.
#[derive(Debug, Default)]
pub struct ExtensionSet {
    buckets: HashMap<TypeId, Vec<Slot>>,
    order: Vec<TypeId>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an extension instance under the policy given by `opts`.
    pub fn attach<T: Extension>(&mut self, ext: T, opts: AttachOptions) {
        self.attach_boxed(Box::new(ext), opts);
    }

    /// Attach an already-boxed extension instance.
    pub fn attach_boxed(&mut self, ext: Box<dyn Extension>, opts: AttachOptions) {
        let tid = ext.as_any().type_id();
        if !self.buckets.contains_key(&tid) {
            self.order.push(tid);
        }
        let bucket = self.buckets.entry(tid).or_default();
        if opts.ignore_if_present && !bucket.is_empty() {
            return;
        }
        if opts.overwrite {
            bucket.clear();
        }
        bucket.push(Slot {
            ext,
            clone_on_copy: opts.clone_on_copy,
        });
    }

    /// All extensions of the exact concrete type `T`, in attach order.
    pub fn by_type<T: Extension>(&self) -> impl Iterator<Item = &T> {
        self.buckets
            .get(&TypeId::of::<T>())
            .into_iter()
            .flatten()
            .filter_map(|slot| slot.ext.as_any().downcast_ref::<T>())
    }

    /// First extension of the exact concrete type `T`, if any.
    pub fn first_by_type<T: Extension>(&self) -> Option<&T> {
        self.by_type::<T>().next()
    }

    /// Mutable access to the first extension of type `T`, if any.
    pub fn first_by_type_mut<T: Extension>(&mut self) -> Option<&mut T> {
        self.buckets
            .get_mut(&TypeId::of::<T>())?
            .iter_mut()
            .find_map(|slot| slot.ext.as_any_mut().downcast_mut::<T>())
    }

    /// All extensions claiming `category`, across buckets, in bucket
    /// creation order.
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &dyn Extension> + '_ {
        self.order
            .iter()
            .filter_map(move |tid| self.buckets.get(tid))
            .flatten()
            .filter(move |slot| slot.ext.category() == category)
            .map(|slot| slot.ext.as_ref())
    }

    /// First extension claiming `category`, if any.
    pub fn first_by_category(&self, category: Category) -> Option<&dyn Extension> {
        self.by_category(category).next()
    }

    /// Remove and return all extensions of the exact concrete type `T`.
    ///
    /// Removal drops the whole bucket, including its clone-on-copy marks.
    pub fn remove_by_type<T: Extension>(&mut self) -> Vec<T> {
        let tid = TypeId::of::<T>();
        self.order.retain(|t| *t != tid);
        self.buckets
            .remove(&tid)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|slot| slot.ext.into_any().downcast::<T>().ok())
            .map(|boxed| *boxed)
            .collect()
    }

    /// Remove and return all extensions claiming `category`.
    pub fn remove_by_category(&mut self, category: Category) -> Vec<Box<dyn Extension>> {
        let matching: Vec<TypeId> = self
            .order
            .iter()
            .copied()
            .filter(|tid| {
                self.buckets
                    .get(tid)
                    .map_or(false, |b| b.iter().any(|s| s.ext.category() == category))
            })
            .collect();
        let mut removed = Vec::new();
        for tid in matching {
            self.order.retain(|t| *t != tid);
            if let Some(bucket) = self.buckets.remove(&tid) {
                removed.extend(bucket.into_iter().map(|slot| slot.ext));
            }
        }
        removed
    }

    /// Total number of attached extension instances.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every attached extension.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.order.clear();
    }
}

impl Clone for ExtensionSet {
    /// Cloning keeps only the extensions marked clone-on-copy, which stay
    /// marked on the copy. Everything else (derived caches, analysis
    /// results) does not survive a structural clone.
    fn clone(&self) -> Self {
        let mut copy = ExtensionSet::default();
        for tid in &self.order {
            let Some(bucket) = self.buckets.get(tid) else {
                continue;
            };
            for slot in bucket.iter().filter(|s| s.clone_on_copy) {
                copy.attach_boxed(
                    slot.ext.clone_boxed(),
                    AttachOptions {
                        clone_on_copy: true,
                        ..AttachOptions::default()
                    },
                );
            }
        }
        copy
    }
}
