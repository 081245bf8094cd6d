//! Tag index maintenance executors
//!
//! Thin wrappers over the metadata client. Failures are logged with the
//! space id and index name, then returned as the operator's error.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::context::{Bindings, ExecResult, QueryContext};
use crate::meta::{MetaError, TagIndexDef};
use crate::value::{DataSet, Row, Value};

use super::error::ExecutorResult;
use super::{ExecOutput, Executor};

fn empty() -> ExecOutput {
    ExecResult::new(DataSet::new(Vec::<String>::new())).into()
}

fn log_failure(space_id: i32, action: &str, index: Option<&str>, err: &MetaError) {
    match index {
        Some(index) => error!(space = space_id, index, error = %err, "{} failed", action),
        None => error!(space = space_id, error = %err, "{} failed", action),
    }
}

/// `CREATE TAG INDEX`
pub struct CreateTagIndex {
    ctx: Arc<QueryContext>,
    def: TagIndexDef,
    if_not_exists: bool,
}

impl CreateTagIndex {
    pub fn new(ctx: Arc<QueryContext>, def: TagIndexDef, if_not_exists: bool) -> Self {
        CreateTagIndex {
            ctx,
            def,
            if_not_exists,
        }
    }
}

#[async_trait]
impl Executor for CreateTagIndex {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space_id = self.ctx.space().id;
        self.ctx
            .meta()
            .create_tag_index(space_id, self.def.clone(), self.if_not_exists)
            .await
            .map_err(|e| {
                log_failure(space_id, "create tag index", Some(&self.def.name), &e);
                e
            })?;
        Ok(empty())
    }
}

/// `DROP TAG INDEX`
pub struct DropTagIndex {
    ctx: Arc<QueryContext>,
    name: String,
    if_exists: bool,
}

impl DropTagIndex {
    pub fn new(ctx: Arc<QueryContext>, name: impl Into<String>, if_exists: bool) -> Self {
        DropTagIndex {
            ctx,
            name: name.into(),
            if_exists,
        }
    }
}

#[async_trait]
impl Executor for DropTagIndex {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space_id = self.ctx.space().id;
        self.ctx
            .meta()
            .drop_tag_index(space_id, &self.name, self.if_exists)
            .await
            .map_err(|e| {
                log_failure(space_id, "drop tag index", Some(&self.name), &e);
                e
            })?;
        Ok(empty())
    }
}

/// `DESCRIBE TAG INDEX`: one row per indexed field
pub struct DescTagIndex {
    ctx: Arc<QueryContext>,
    name: String,
}

impl DescTagIndex {
    pub fn new(ctx: Arc<QueryContext>, name: impl Into<String>) -> Self {
        DescTagIndex {
            ctx,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Executor for DescTagIndex {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space_id = self.ctx.space().id;
        let def = self
            .ctx
            .meta()
            .get_tag_index(space_id, &self.name)
            .await
            .map_err(|e| {
                log_failure(space_id, "describe tag index", Some(&self.name), &e);
                e
            })?;

        let mut ds = DataSet::with_capacity(["Field", "Type"], def.fields.len());
        for field in &def.fields {
            ds.push(Row::new(vec![
                Value::from(field.name.as_str()),
                Value::from(field.type_name.as_str()),
            ]))?;
        }
        Ok(ExecResult::new(ds).into())
    }
}

/// The statement that would recreate `def`
pub fn show_create_tag_index(def: &TagIndexDef) -> String {
    let mut stmt = format!("CREATE TAG INDEX `{}` ON `{}` (\n", def.name, def.tag);
    for (i, field) in def.fields.iter().enumerate() {
        let sep = if i + 1 < def.fields.len() { "," } else { "" };
        // writing into a String cannot fail
        let _ = writeln!(stmt, " `{}`{}", field.name, sep);
    }
    stmt.push(')');
    stmt
}

/// `SHOW CREATE TAG INDEX`
pub struct ShowCreateTagIndex {
    ctx: Arc<QueryContext>,
    name: String,
}

impl ShowCreateTagIndex {
    pub fn new(ctx: Arc<QueryContext>, name: impl Into<String>) -> Self {
        ShowCreateTagIndex {
            ctx,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Executor for ShowCreateTagIndex {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space_id = self.ctx.space().id;
        let def = self
            .ctx
            .meta()
            .get_tag_index(space_id, &self.name)
            .await
            .map_err(|e| {
                log_failure(space_id, "show create tag index", Some(&self.name), &e);
                e
            })?;

        let ds = DataSet::from_rows(
            ["Tag Index Name", "Create Tag Index"],
            vec![Row::new(vec![
                Value::from(self.name.as_str()),
                Value::from(show_create_tag_index(&def)),
            ])],
        )?;
        Ok(ExecResult::new(ds).into())
    }
}

/// `SHOW TAG INDEXES`: index names, sorted
pub struct ShowTagIndexes {
    ctx: Arc<QueryContext>,
}

impl ShowTagIndexes {
    pub fn new(ctx: Arc<QueryContext>) -> Self {
        ShowTagIndexes { ctx }
    }
}

#[async_trait]
impl Executor for ShowTagIndexes {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space_id = self.ctx.space().id;
        let indexes = self
            .ctx
            .meta()
            .list_tag_indexes(space_id)
            .await
            .map_err(|e| {
                log_failure(space_id, "show tag indexes", None, &e);
                e
            })?;

        let names: BTreeSet<String> = indexes.into_iter().map(|idx| idx.name).collect();
        let mut ds = DataSet::with_capacity(["Names"], names.len());
        for name in names {
            ds.push(Row::new(vec![Value::from(name)]))?;
        }
        Ok(ExecResult::new(ds).into())
    }
}

/// `SHOW TAG INDEX STATUS`: rows in the order the metadata tier lists them
pub struct ShowTagIndexStatus {
    ctx: Arc<QueryContext>,
}

impl ShowTagIndexStatus {
    pub fn new(ctx: Arc<QueryContext>) -> Self {
        ShowTagIndexStatus { ctx }
    }
}

#[async_trait]
impl Executor for ShowTagIndexStatus {
    async fn execute(&mut self, _inputs: &Bindings) -> ExecutorResult<ExecOutput> {
        let space_id = self.ctx.space().id;
        let statuses = self
            .ctx
            .meta()
            .list_tag_index_status(space_id)
            .await
            .map_err(|e| {
                log_failure(space_id, "show tag index status", None, &e);
                e
            })?;

        let mut ds = DataSet::with_capacity(["Name", "Index Status"], statuses.len());
        for status in statuses {
            ds.push(Row::new(vec![
                Value::from(status.name),
                Value::from(status.status),
            ]))?;
        }
        Ok(ExecResult::new(ds).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorError;
    use crate::meta::{IndexField, MemoryMeta, VidType};
    use crate::storage::MemoryStorage;

    fn context() -> Arc<QueryContext> {
        let meta = MemoryMeta::new();
        let space = meta.create_space("nba", VidType::String);
        meta.create_tag(space.id, "player").unwrap();
        Arc::new(QueryContext::new(
            space,
            Arc::new(MemoryStorage::new()),
            Arc::new(meta),
        ))
    }

    fn def(name: &str) -> TagIndexDef {
        TagIndexDef::new(
            name,
            "player",
            vec![
                IndexField::new("name", "string"),
                IndexField::new("age", "int64"),
            ],
        )
    }

    async fn create(ctx: &Arc<QueryContext>, name: &str) {
        CreateTagIndex::new(Arc::clone(ctx), def(name), false)
            .execute(&Bindings::empty())
            .await
            .unwrap();
    }

    fn column(out: &ExecOutput, col: &str) -> Vec<Value> {
        out.result.data().column(col).unwrap().cloned().collect()
    }

    #[tokio::test]
    async fn test_show_tag_indexes_sorted() {
        let ctx = context();
        create(&ctx, "b_idx").await;
        create(&ctx, "a_idx").await;

        let out = ShowTagIndexes::new(Arc::clone(&ctx))
            .execute(&Bindings::empty())
            .await
            .unwrap();
        assert_eq!(column(&out, "Names"), vec![Value::from("a_idx"), Value::from("b_idx")]);

        let out = ShowTagIndexStatus::new(Arc::clone(&ctx))
            .execute(&Bindings::empty())
            .await
            .unwrap();
        assert_eq!(column(&out, "Name"), vec![Value::from("b_idx"), Value::from("a_idx")]);
        assert_eq!(out.result.data().col_names(), &["Name", "Index Status"]);
    }

    #[tokio::test]
    async fn test_desc_and_show_create() {
        let ctx = context();
        create(&ctx, "idx").await;

        let out = DescTagIndex::new(Arc::clone(&ctx), "idx")
            .execute(&Bindings::empty())
            .await
            .unwrap();
        assert_eq!(column(&out, "Field"), vec![Value::from("name"), Value::from("age")]);

        let out = ShowCreateTagIndex::new(Arc::clone(&ctx), "idx")
            .execute(&Bindings::empty())
            .await
            .unwrap();
        assert_eq!(
            column(&out, "Create Tag Index"),
            vec![Value::from(
                "CREATE TAG INDEX `idx` ON `player` (\n `name`,\n `age`\n)"
            )]
        );
    }

    #[tokio::test]
    async fn test_failures_surface_meta_errors() {
        let ctx = context();
        create(&ctx, "idx").await;

        let dup = CreateTagIndex::new(Arc::clone(&ctx), def("idx"), false)
            .execute(&Bindings::empty())
            .await;
        assert!(matches!(
            dup,
            Err(ExecutorError::Meta(MetaError::IndexExists(_)))
        ));

        DropTagIndex::new(Arc::clone(&ctx), "idx", false)
            .execute(&Bindings::empty())
            .await
            .unwrap();
        let missing = DescTagIndex::new(Arc::clone(&ctx), "idx")
            .execute(&Bindings::empty())
            .await;
        assert!(matches!(
            missing,
            Err(ExecutorError::Meta(MetaError::IndexNotFound(_)))
        ));
    }
}
