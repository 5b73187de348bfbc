// This macro generates a struct which exposes a u32 API for an index type, so that rule and
// symbol indices can't be mixed up with each other or with plain integers.

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $n(pub u32);

        impl From<$n> for usize {
            fn from(i: $n) -> usize {
                i.0 as usize
            }
        }

        impl From<$n> for u32 {
            fn from(i: $n) -> u32 {
                i.0
            }
        }

        impl From<usize> for $n {
            fn from(i: usize) -> $n {
                debug_assert!(u32::try_from(i).is_ok());
                $n(i as u32)
            }
        }
    };
}

IdxNewtype!(
    /// A type specifically for rule indices.
    ///
    /// Note that a single `add_rule` call can register several rules (one per
    /// optional-symbol variant), each with its own `RIdx`.
    RIdx
);
IdxNewtype!(
    /// A type specifically for symbol indices in a grammar's interned alphabet. Terminals and
    /// non-terminals share one index space: whether a given `SyIdx` is a terminal depends on
    /// whether a rule for it has been registered.
    SyIdx
);
