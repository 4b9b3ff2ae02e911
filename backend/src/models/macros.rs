/// Declares a code newtype over a small unsigned integer.
///
/// Land-cover rasters carry two kinds of `u8` values that must not be mixed
/// up: raw collection codes read from the asset (`ClassCode`) and the
/// dashboard categories they are remapped to (`CategoryCode`). Each gets its
/// own type with ordering, hashing, transparent serde, `Display` and
/// conversions to and from the inner integer.
///
/// ```
/// lulc_dash::define_code_type!(u8, BiomeCode);
///
/// let code = BiomeCode::new(4);
/// assert_eq!(u8::from(code), 4);
/// assert_eq!(code.to_string(), "4");
/// ```
#[macro_export]
macro_rules! define_code_type {
    ($inner:ty, $name:ident) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::std::convert::From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }

        impl ::std::convert::From<$name> for $inner {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl $name {
            pub const fn new(value: $inner) -> Self {
                $name(value)
            }

            pub const fn value(&self) -> $inner {
                self.0
            }
        }
    };
}
