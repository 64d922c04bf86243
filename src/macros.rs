//! The [`manifest!`](crate::manifest) macro: declare a query's columns once
//! and get the manifest type, detached field constructors, and a typed
//! accessor trait for result rows.

/// Declare a column manifest.
///
/// Each line names an accessor, its Rust type, and the `("column", "table")`
/// pair it maps to, prefixed with one of three kinds: `primary` marks a key
/// column rows are written back through, `updateable` produces an
/// [`UpdateableField`](crate::fields::UpdateableField), and `field` produces
/// a read-only [`Field`](crate::fields::Field).
///
/// The macro expands to a marker type implementing
/// [`Manifest`](crate::query::Manifest), an associated constructor per
/// column giving a detached field for filter building, and an accessor trait
/// implemented for [`RowHandle`](crate::query::RowHandle) so result rows can
/// be read by name.
///
/// ```
/// use sql_rowbind::manifest;
/// use sql_rowbind::pool::ConnectionPool;
/// use sql_rowbind::query::Query;
/// use sql_rowbind::types::ConnectionConfig;
///
/// manifest! {
///     pub BookRow with BookRowAccess {
///         primary id: i64 => ("id", "books"),
///         updateable title: String => ("title", "books"),
///     }
/// }
///
/// let pool = ConnectionPool::new(ConnectionConfig::sqlite("books.db"));
/// let query = Query::<BookRow>::new(&pool);
/// assert_eq!(query.compile(None), "select books.id,books.title from books");
/// ```
#[macro_export]
macro_rules! manifest {
    (@accessor_impls ($idx:expr)) => {};
    (@accessor_impls ($idx:expr) ($kind:ident $fname:ident $ty:ty) $($rest:tt)*) => {
        fn $fname(
            &self,
        ) -> ::core::result::Result<
            $crate::__rowbind_field_type!($kind, $ty),
            $crate::error::RowBindError,
        > {
            self.field::<$crate::__rowbind_field_type!($kind, $ty)>($idx)
        }
        $crate::manifest! { @accessor_impls ($idx + 1usize) $($rest)* }
    };
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident with $trait_name:ident {
            $($kind:ident $fname:ident : $ty:ty => ($col:expr, $table:expr)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        $vis struct $name;

        impl $crate::query::Manifest for $name {
            const FIELDS: &'static [$crate::fields::FieldSpec] = &[
                $($crate::__rowbind_spec!($kind, $col, $table)),+
            ];
        }

        impl $name {
            $(
                /// A detached field for this column, for building filters.
                #[must_use]
                $vis fn $fname() -> $crate::__rowbind_field_type!($kind, $ty) {
                    <$crate::__rowbind_field_type!($kind, $ty) as $crate::fields::BindableField>::bind(
                        $crate::__rowbind_spec!($kind, $col, $table),
                    )
                }
            )+
        }

        /// Typed accessors for one result row of this manifest.
        $vis trait $trait_name {
            $(
                fn $fname(
                    &self,
                ) -> ::core::result::Result<
                    $crate::__rowbind_field_type!($kind, $ty),
                    $crate::error::RowBindError,
                >;
            )+
        }

        impl<'q> $trait_name for $crate::query::RowHandle<'q, $name> {
            $crate::manifest! { @accessor_impls (0usize) $(($kind $fname $ty))+ }
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __rowbind_spec {
    (primary, $col:expr, $table:expr) => {
        $crate::fields::FieldSpec {
            column: $col,
            table: $table,
            primary: true,
        }
    };
    (updateable, $col:expr, $table:expr) => {
        $crate::fields::FieldSpec {
            column: $col,
            table: $table,
            primary: false,
        }
    };
    (field, $col:expr, $table:expr) => {
        $crate::fields::FieldSpec {
            column: $col,
            table: $table,
            primary: false,
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __rowbind_field_type {
    (primary, $ty:ty) => { $crate::fields::Field<$ty> };
    (updateable, $ty:ty) => { $crate::fields::UpdateableField<$ty> };
    (field, $ty:ty) => { $crate::fields::Field<$ty> };
}
