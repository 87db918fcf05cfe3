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

//! A macro to declare bit flag sets.

/// Declares a `Copy` flag set over an integer type, with named constants, set
/// operations, bitwise operators and a `Debug` listing the flags that are set.
#[macro_export]
#[doc(hidden)]
macro_rules! vesta_bitflags {
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
            /// No flags.
            pub const EMPTY: Self = Self { bits: 0 };

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// Builds a set from raw bits, unknown bits included.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Returns the raw bits.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns `true` if every flag in `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if `self` and `other` share a flag.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// The flags set in either `self` or `other`.
            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            /// `self` without the flags in `other`.
            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                Self { bits: self.bits & !other.bits }
            }

            /// Sets the flags in `other`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Clears the flags in `other`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                self.union(other)
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::ops::BitAndAssign for $name {
            fn bitand_assign(&mut self, other: Self) {
                self.bits &= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut rest = self.bits;
                let mut first = true;
                write!(f, "{} {{ ", stringify!($name))?;
                $(
                    // Composite constants absorb their parts when declared first.
                    if ($flag_value != 0) && (rest & $flag_value) == $flag_value {
                        if !first {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", stringify!($flag_name))?;
                        rest &= !$flag_value;
                        first = false;
                    }
                )*
                if rest != 0 {
                    if !first {
                        write!(f, " | ")?;
                    }
                    write!(f, "UNKNOWN({:#x})", rest)?;
                    first = false;
                }
                if first {
                    write!(f, "EMPTY")?;
                }
                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::vesta_bitflags;

    vesta_bitflags! {
        /// Channels used by the tests.
        pub struct Channels: u8 {
            const X = 1 << 0;
            const Y = 1 << 1;
            const Z = 1 << 2;
            const XZ = Self::X.bits() | Self::Z.bits();
        }
    }

    #[test]
    fn default_is_empty() {
        assert!(Channels::default().is_empty());
        assert_eq!(Channels::default(), Channels::EMPTY);
        assert_eq!(format!("{:?}", Channels::EMPTY), "Channels { EMPTY }");
    }

    #[test]
    fn operators_combine_flags() {
        let mut set = Channels::X | Channels::Y;
        assert!(set.contains(Channels::X));
        assert!(!set.contains(Channels::XZ));
        assert!(set.intersects(Channels::XZ));
        assert_eq!((set & Channels::XZ), Channels::X);

        set |= Channels::Z;
        assert_eq!(set.bits(), 0b111);
        set.remove(Channels::Y);
        assert_eq!(set, Channels::XZ);
        assert_eq!(set.without(Channels::Z), Channels::X);
        set.insert(Channels::Y);
        assert_eq!(set.bits(), 0b111);
    }

    #[test]
    fn debug_lists_flags_and_unknown_bits() {
        assert_eq!(format!("{:?}", Channels::X | Channels::Y), "Channels { X | Y }");
        assert_eq!(
            format!("{:?}", Channels::Y | Channels::from_bits_truncate(0x40)),
            "Channels { Y | UNKNOWN(0x40) }"
        );
    }
}
