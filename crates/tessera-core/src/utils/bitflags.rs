// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Flag sets over an unsigned integer.
//!
//! [`tessera_bitflags!`] builds a newtype with one associated constant per
//! named flag, the usual set operators and a name table that drives `Debug`
//! and the string names accepted in configuration files.

#[macro_export]
#[doc(hidden)]
macro_rules! tessera_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            pub(crate) bits: $ty,
        }

        impl $name {
            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// The set with no flag.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Every named flag with its name, in declaration order.
            pub const NAMED: &'static [(&'static str, Self)] = &[
                $((stringify!($flag_name), Self { bits: $flag_value }),)*
            ];

            /// Wraps raw bits. Bits without a name are kept.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// The raw bits.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// No bit is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Every bit of `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                self.bits & other.bits == other.bits
            }

            /// At least one bit of `other` is set in `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                self.bits & other.bits != 0
            }

            /// Sets the bits of `other`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Clears the bits of `other`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// `self` with the bits of `other` set.
            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            /// `self` with the bits of `other` cleared.
            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                Self { bits: self.bits & !other.bits }
            }

            /// Looks a single named flag up, ignoring ASCII case.
            pub fn from_flag_name(name: &str) -> Option<Self> {
                Self::NAMED
                    .iter()
                    .find(|(flag, _)| flag.eq_ignore_ascii_case(name))
                    .map(|&(_, value)| value)
            }

            /// The named flags fully contained in `self`.
            pub fn iter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
                Self::NAMED
                    .iter()
                    .filter(move |(_, value)| !value.is_empty() && self.contains(*value))
                    .map(|&(flag, _)| flag)
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                self.with(other)
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::Sub for $name {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                self.without(other)
            }
        }

        impl core::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self { bits: !self.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.insert(other);
            }
        }

        impl core::ops::BitAndAssign for $name {
            fn bitand_assign(&mut self, other: Self) {
                self.bits &= other.bits;
            }
        }

        impl core::iter::FromIterator<$name> for $name {
            fn from_iter<I: IntoIterator<Item = $name>>(iter: I) -> Self {
                iter.into_iter().fold(Self::EMPTY, Self::with)
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{} {{ ", stringify!($name))?;
                if self.is_empty() {
                    return write!(f, "EMPTY }}");
                }
                // Greedy over the table, so composite names absorb their parts.
                let mut rest = *self;
                let mut separator = "";
                for &(flag, value) in Self::NAMED {
                    if !value.is_empty() && rest.contains(value) {
                        write!(f, "{separator}{flag}")?;
                        rest.remove(value);
                        separator = " | ";
                    }
                }
                if !rest.is_empty() {
                    write!(f, "{separator}UNKNOWN({:#x})", rest.bits)?;
                }
                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::tessera_bitflags;

    tessera_bitflags! {
        pub struct Access: u16 {
            const READ = 1 << 0;
            const WRITE = 1 << 1;
            const EXECUTE = 1 << 2;
        }
    }

    #[test]
    fn set_algebra() {
        let rw = Access::READ | Access::WRITE;
        assert!(rw.contains(Access::READ));
        assert!(!rw.contains(Access::READ | Access::EXECUTE));
        assert!(rw.intersects(Access::WRITE | Access::EXECUTE));
        assert_eq!(rw - Access::READ, Access::WRITE);
        assert_eq!(rw & Access::WRITE, Access::WRITE);
        assert_eq!(Access::READ.with(Access::EXECUTE).without(Access::READ), Access::EXECUTE);
        assert!(Access::default().is_empty());

        let mut flags = Access::EMPTY;
        flags |= Access::EXECUTE;
        flags.remove(Access::EXECUTE);
        assert_eq!(flags, Access::EMPTY);
    }

    #[test]
    fn names_round_trip_through_the_table() {
        assert_eq!(Access::from_flag_name("write"), Some(Access::WRITE));
        assert_eq!(Access::from_flag_name("EXECUTE"), Some(Access::EXECUTE));
        assert_eq!(Access::from_flag_name("delete"), None);

        let all: Access = Access::NAMED.iter().map(|&(_, value)| value).collect();
        assert_eq!(all.iter_names().collect::<Vec<_>>(), ["READ", "WRITE", "EXECUTE"]);
    }

    #[test]
    fn debug_lists_named_then_unknown_bits() {
        assert_eq!(format!("{:?}", Access::EMPTY), "Access { EMPTY }");
        assert_eq!(format!("{:?}", Access::READ | Access::EXECUTE), "Access { READ | EXECUTE }");
        assert_eq!(
            format!("{:?}", Access::from_bits_truncate(0b10 | 1 << 9)),
            "Access { WRITE | UNKNOWN(0x200) }"
        );
    }
}
