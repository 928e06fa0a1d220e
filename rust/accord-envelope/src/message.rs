use facet::Facet;

/// Envelope with no values (empty request or `()` response).
#[derive(Facet, Debug, Clone, PartialEq, Default)]
pub struct Message0 {}

impl Message0 {
    pub const ARITY: usize = 0;

    pub fn new() -> Self {
        Self {}
    }
}

macro_rules! declare_message {
    ($(#[$meta:meta])* $name:ident, $arity:expr; $($field:ident: $ty:ident),+) => {
        $(#[$meta])*
        #[derive(Facet, Debug, Clone, PartialEq, Default)]
        pub struct $name<$($ty),+> {
            $(pub $field: $ty,)+
        }

        impl<$($ty),+> $name<$($ty),+> {
            pub const ARITY: usize = $arity;

            /// Positional constructor.
            pub fn new($($field: $ty),+) -> Self {
                Self { $($field),+ }
            }
        }
    };
}

declare_message!(
    /// Envelope carrying one value.
    Message1, 1; value1: T1
);

declare_message!(
    /// Envelope carrying two values.
    Message2, 2; value1: T1, value2: T2
);

declare_message!(
    /// Envelope carrying three values.
    Message3, 3; value1: T1, value2: T2, value3: T3
);
