use crate::context::{Context, ManagedObject};
use crate::core::Result;
use crate::query::{FetchRequest, Predicate, SortDescriptor};
use crate::schema::EntityDescription;
use crate::shared;
use std::sync::Arc;

/// A typed record over one entity of the model.
///
/// Implementors name their entity and wrap a [`ManagedObject`]; every other
/// operation is provided. Wherever a context is optional, `None` means the
/// shared context.
///
/// ```ignore
/// managed_record!(pub Article, "Article");
///
/// let article = Article::init_with_context(Some(&ctx))?;
/// article.object().set("title", "Hello")?;
/// article.save()?;
/// ```
pub trait Record: Sized {
    /// Name of the entity this record type is stored as.
    fn entity_name() -> &'static str;

    fn from_object(object: ManagedObject) -> Self;

    fn object(&self) -> &ManagedObject;

    /// Natural ordering used by the fetch helpers. Unordered by default.
    fn default_sort_descriptors() -> Vec<SortDescriptor> {
        Vec::new()
    }

    fn entity(ctx: Option<&Context>) -> Result<Arc<EntityDescription>> {
        resolve_context(ctx)?.entity_description(Self::entity_name())
    }

    /// Creates a new record, pending in `ctx` until that context is saved.
    fn init_with_context(ctx: Option<&Context>) -> Result<Self> {
        let ctx = resolve_context(ctx)?;
        let object = ctx.insert_new_object(Self::entity_name())?;
        Ok(Self::from_object(object))
    }

    fn context(&self) -> Result<Context> {
        self.object().context()
    }

    /// Commits every pending change of this record's context, not only the
    /// changes to this record.
    fn save(&self) -> Result<()> {
        self.context()?.save()
    }

    /// Stages this record for deletion in its context.
    fn delete(&self) -> Result<()> {
        self.context()?.delete(self.object())
    }

    fn fetch(ctx: Option<&Context>, predicate: Predicate) -> Result<Vec<Self>> {
        let request = FetchRequest::new(Self::entity_name())
            .predicate(predicate)
            .sort_by(Self::default_sort_descriptors());
        let objects = resolve_context(ctx)?.execute_fetch(&request)?;
        Ok(objects.into_iter().map(Self::from_object).collect())
    }

    fn fetch_all(ctx: Option<&Context>) -> Result<Vec<Self>> {
        Self::fetch(ctx, Predicate::True)
    }

    fn fetch_first(ctx: Option<&Context>, predicate: Predicate) -> Result<Option<Self>> {
        let request = FetchRequest::new(Self::entity_name())
            .predicate(predicate)
            .sort_by(Self::default_sort_descriptors())
            .limit(1);
        let objects = resolve_context(ctx)?.execute_fetch(&request)?;
        Ok(objects.into_iter().next().map(Self::from_object))
    }

    fn count(ctx: Option<&Context>, predicate: Predicate) -> Result<usize> {
        let request = FetchRequest::new(Self::entity_name()).predicate(predicate);
        resolve_context(ctx)?.count(&request)
    }

    /// Whether both records wrap the same object of the same context.
    fn is_same_record(&self, other: &Self) -> bool {
        self.object().ptr_eq(other.object())
    }
}

pub(crate) fn resolve_context(ctx: Option<&Context>) -> Result<Context> {
    match ctx {
        Some(ctx) => Ok(ctx.clone()),
        None => shared::shared_context(),
    }
}
