//! Declares a record handle type together with its [`Record`](crate::record::Record)
//! implementation.
//!
//! ```ignore
//! managed_record!(pub Article, "Article");
//! managed_record!(pub Post, "Post", sort = [SortDescriptor::descending("updated_at")]);
//! ```

#[macro_export]
macro_rules! managed_record {
    ($vis:vis $name:ident, $entity:literal) => {
        $crate::managed_record!($vis $name, $entity, sort = []);
    };
    ($vis:vis $name:ident, $entity:literal, sort = [$($sort:expr),* $(,)?]) => {
        #[derive(Debug, Clone)]
        $vis struct $name {
            object: $crate::context::ManagedObject,
        }

        impl $crate::record::Record for $name {
            fn entity_name() -> &'static str {
                $entity
            }

            fn from_object(object: $crate::context::ManagedObject) -> Self {
                Self { object }
            }

            fn object(&self) -> &$crate::context::ManagedObject {
                &self.object
            }

            fn default_sort_descriptors() -> Vec<$crate::query::SortDescriptor> {
                vec![$($sort),*]
            }
        }
    };
}
