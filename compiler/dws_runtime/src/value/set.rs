//! Set and enum values.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::types::EnumType;

/// What a set's members are drawn from.
#[derive(Clone, Debug)]
pub enum SetDomain {
    Enum(Rc<EnumType>),
    /// Integers or characters (by code point).
    Ordinal,
}

impl SetDomain {
    fn same(&self, other: &SetDomain) -> bool {
        match (self, other) {
            (SetDomain::Enum(a), SetDomain::Enum(b)) => a.id == b.id,
            (SetDomain::Ordinal, SetDomain::Ordinal) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Storage {
    /// Ordinals 0..64 as a bit mask.
    Bits(u64),
    Sparse(BTreeSet<i64>),
}

/// A set of ordinals.
///
/// Small ordinal ranges (every enum of up to 64 members) use a fixed-width
/// bit mask; anything else falls back to an ordered set.
#[derive(Clone)]
pub struct SetValue {
    domain: SetDomain,
    storage: Storage,
}

impl SetValue {
    pub fn empty(domain: SetDomain) -> Self {
        SetValue {
            domain,
            storage: Storage::Bits(0),
        }
    }

    pub fn from_ordinals(domain: SetDomain, ordinals: impl IntoIterator<Item = i64>) -> Self {
        let mut set = SetValue::empty(domain);
        for ord in ordinals {
            set.insert(ord);
        }
        set
    }

    pub fn domain(&self) -> &SetDomain {
        &self.domain
    }

    pub fn enum_type(&self) -> Option<&Rc<EnumType>> {
        match &self.domain {
            SetDomain::Enum(ty) => Some(ty),
            SetDomain::Ordinal => None,
        }
    }

    fn bit(ord: i64) -> Option<u64> {
        (0..64).contains(&ord).then(|| 1u64 << ord)
    }

    pub fn contains(&self, ord: i64) -> bool {
        match &self.storage {
            Storage::Bits(mask) => Self::bit(ord).is_some_and(|b| mask & b != 0),
            Storage::Sparse(set) => set.contains(&ord),
        }
    }

    pub fn insert(&mut self, ord: i64) {
        match (&mut self.storage, Self::bit(ord)) {
            (Storage::Bits(mask), Some(b)) => *mask |= b,
            (Storage::Bits(_), None) => {
                let mut set: BTreeSet<i64> = self.ordinals().into_iter().collect();
                set.insert(ord);
                self.storage = Storage::Sparse(set);
            }
            (Storage::Sparse(set), _) => {
                set.insert(ord);
            }
        }
    }

    pub fn remove(&mut self, ord: i64) {
        match (&mut self.storage, Self::bit(ord)) {
            (Storage::Bits(mask), Some(b)) => *mask &= !b,
            (Storage::Bits(_), None) => {}
            (Storage::Sparse(set), _) => {
                set.remove(&ord);
            }
        }
    }

    /// Members in ascending ordinal order.
    pub fn ordinals(&self) -> Vec<i64> {
        match &self.storage {
            Storage::Bits(mask) => (0..64).filter(|i| mask & (1u64 << i) != 0).collect(),
            Storage::Sparse(set) => set.iter().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Bits(mask) => mask.count_ones() as usize,
            Storage::Sparse(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn union(&self, other: &SetValue) -> SetValue {
        if let (Storage::Bits(a), Storage::Bits(b)) = (&self.storage, &other.storage) {
            return self.with_storage(Storage::Bits(a | b));
        }
        let mut out = self.clone();
        for ord in other.ordinals() {
            out.insert(ord);
        }
        out
    }

    #[must_use]
    pub fn difference(&self, other: &SetValue) -> SetValue {
        if let (Storage::Bits(a), Storage::Bits(b)) = (&self.storage, &other.storage) {
            return self.with_storage(Storage::Bits(a & !b));
        }
        let kept = self.ordinals().into_iter().filter(|o| !other.contains(*o));
        SetValue::from_ordinals(self.domain.clone(), kept)
    }

    #[must_use]
    pub fn intersection(&self, other: &SetValue) -> SetValue {
        if let (Storage::Bits(a), Storage::Bits(b)) = (&self.storage, &other.storage) {
            return self.with_storage(Storage::Bits(a & b));
        }
        let kept = self.ordinals().into_iter().filter(|o| other.contains(*o));
        SetValue::from_ordinals(self.domain.clone(), kept)
    }

    pub fn is_subset(&self, other: &SetValue) -> bool {
        self.ordinals().into_iter().all(|o| other.contains(o))
    }

    /// Same members; the domain is ignored when either side is an untyped
    /// literal.
    pub fn same_members(&self, other: &SetValue) -> bool {
        self.ordinals() == other.ordinals()
    }

    pub fn compatible_with(&self, other: &SetValue) -> bool {
        self.domain.same(&other.domain)
            || matches!(self.domain, SetDomain::Ordinal)
            || matches!(other.domain, SetDomain::Ordinal)
    }

    fn with_storage(&self, storage: Storage) -> SetValue {
        SetValue {
            domain: self.domain.clone(),
            storage,
        }
    }

    /// Member display names: enum member names, or the ordinals.
    pub fn member_names(&self) -> Vec<String> {
        self.ordinals()
            .into_iter()
            .map(|ord| match &self.domain {
                SetDomain::Enum(ty) => ty
                    .name_of(ord)
                    .map_or_else(|| ord.to_string(), ToString::to_string),
                SetDomain::Ordinal => ord.to_string(),
            })
            .collect()
    }
}

impl fmt::Debug for SetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.member_names().join(", "))
    }
}

/// An enumeration value.
#[derive(Clone)]
pub struct EnumValue {
    pub ty: Rc<EnumType>,
    pub ordinal: i64,
}

impl EnumValue {
    pub fn new(ty: Rc<EnumType>, ordinal: i64) -> Self {
        EnumValue { ty, ordinal }
    }

    /// Member name, or the ordinal when it names no member (flag
    /// combinations, out-of-range casts).
    pub fn name(&self) -> String {
        self.ty
            .name_of(self.ordinal)
            .map_or_else(|| self.ordinal.to_string(), ToString::to_string)
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ty.name, self.name())
    }
}
