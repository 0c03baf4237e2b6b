use sea_query::{
    Alias as SeaAlias, ColumnDef, DeleteStatement, Expr as SeaExpr, Func as SeaFunc, Iden, Index, InsertStatement, Order as SeaOrder, Query as SeaQuery,
    SqliteQueryBuilder, Table, UpdateStatement,
};
use sea_query_binder::SqlxBinder;
use sqlx::{Error as DbError, Row, sqlite::SqliteRow};

use crate::{
    Result,
    store::{
        DbCollection, PageData, data,
        db::sqlite::{BoundSql, DbInit, DbRow, DbStatement},
        query,
    },
};

use super::{DbConnection, into_query, map_db_err, map_find_err};

#[derive(Debug)]
pub struct ResearchCollection {
    conn: DbConnection,
}

#[derive(Iden)]
#[iden = "research"]
enum CollectionIden {
    Table,

    Id,
    Pid,
    Kind,
    Data,
    Timestamp,
}

const COLUMNS: [CollectionIden; 5] = [
    CollectionIden::Id,
    CollectionIden::Pid,
    CollectionIden::Kind,
    CollectionIden::Data,
    CollectionIden::Timestamp,
];

impl DbCollection for ResearchCollection {
    type Item = data::Research;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let (sql, values) = SeaQuery::select()
            .from(CollectionIden::Table)
            .expr(SeaFunc::count(SeaExpr::col(CollectionIden::Id)))
            .and_where(SeaExpr::col(CollectionIden::Id).eq(id))
            .build_sqlx(SqliteQueryBuilder);

        let count = self.conn.query_one(sql.as_str(), values).map(|row| row.get::<i64, usize>(0)).map_err(map_db_err)?;

        Ok(count > 0)
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        let (sql, values) =
            SeaQuery::select().from(CollectionIden::Table).columns(COLUMNS).and_where(SeaExpr::col(CollectionIden::Id).eq(id)).build_sqlx(SqliteQueryBuilder);

        let row = self.conn.query_one(&sql, values).map_err(map_find_err("research", id))?;
        Self::Item::from_row(&row).map_err(map_db_err)
    }

    fn query(
        &self,
        q: &query::Query,
    ) -> Result<PageData<Self::Item>> {
        let filter = into_query(q);

        let mut count_query = SeaQuery::select();
        count_query.from(CollectionIden::Table).expr(SeaFunc::count(SeaExpr::col(CollectionIden::Id)));

        let mut query = SeaQuery::select();
        query.columns(COLUMNS).from(CollectionIden::Table);

        if !filter.is_empty() {
            count_query.cond_where(filter.clone());
            query.cond_where(filter);
        }

        for (order, rev) in q.orders().iter() {
            query.order_by(
                SeaAlias::new(order.as_str()),
                if *rev {
                    SeaOrder::Desc
                } else {
                    SeaOrder::Asc
                },
            );
        }
        let (sql, values) = query.limit(q.page_size() as u64).offset(q.skip() as u64).build_sqlx(SqliteQueryBuilder);

        let (count_sql, count_values) = count_query.build_sqlx(SqliteQueryBuilder);
        let count = self.conn.query_one(count_sql.as_str(), count_values).map_err(map_db_err)?.get::<i64, usize>(0) as usize;
        let rows = self
            .conn
            .query(&sql, values)
            .map_err(map_db_err)?
            .iter()
            .map(|row| Self::Item::from_row(row).map_err(map_db_err))
            .collect::<Result<Vec<_>>>()?;

        Ok(PageData::new(q, count, rows))
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let (sql, sql_values) = self.insert_stmt(data)?.build_sqlx(SqliteQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let (sql, sql_values) = self.update_stmt(data).build_sqlx(SqliteQueryBuilder);

        let result = self.conn.execute(sql.as_str(), sql_values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        let (sql, values) = self.delete_stmt(id).build_sqlx(SqliteQueryBuilder);

        let result = self.conn.execute(sql.as_str(), values).map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

impl DbStatement for ResearchCollection {
    type Item = data::Research;

    fn insert_sql(
        &self,
        data: &Self::Item,
    ) -> Result<BoundSql> {
        Ok(self.insert_stmt(data)?.build_sqlx(SqliteQueryBuilder))
    }

    fn update_sql(
        &self,
        data: &Self::Item,
    ) -> BoundSql {
        self.update_stmt(data).build_sqlx(SqliteQueryBuilder)
    }

    fn delete_sql(
        &self,
        id: &str,
    ) -> BoundSql {
        self.delete_stmt(id).build_sqlx(SqliteQueryBuilder)
    }
}

impl DbRow for data::Research {
    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &SqliteRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized,
    {
        Ok(Self {
            id: row.try_get("id")?,
            pid: row.try_get("pid")?,
            kind: row.try_get("kind")?,
            data: row.try_get("data")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

impl DbInit for ResearchCollection {
    fn init(&self) -> Result<()> {
        let sql = [
            Table::create()
                .table(CollectionIden::Table)
                .if_not_exists()
                .col(ColumnDef::new(CollectionIden::Id).string().not_null().primary_key())
                .col(ColumnDef::new(CollectionIden::Pid).string().not_null())
                .col(ColumnDef::new(CollectionIden::Kind).string().not_null())
                .col(ColumnDef::new(CollectionIden::Data).text().not_null())
                .col(ColumnDef::new(CollectionIden::Timestamp).big_integer().default(0))
                .build(SqliteQueryBuilder),
            Index::create().name("idx_research_pid").if_not_exists().table(CollectionIden::Table).col(CollectionIden::Pid).build(SqliteQueryBuilder),
        ];

        self.conn.batch_execute(&sql).map_err(map_db_err)
    }
}

impl ResearchCollection {
    pub fn new(conn: &DbConnection) -> Self {
        Self {
            conn: conn.clone(),
        }
    }

    fn insert_stmt(
        &self,
        data: &data::Research,
    ) -> Result<InsertStatement> {
        let data = data.clone();
        let mut stmt = SeaQuery::insert();
        stmt.into_table(CollectionIden::Table)
            .columns(COLUMNS)
            .values([
                data.id.into(),
                data.pid.into(),
                data.kind.into(),
                data.data.into(),
                data.timestamp.into(),
            ])
            .map_err(map_db_err)?;
        Ok(stmt)
    }

    fn update_stmt(
        &self,
        data: &data::Research,
    ) -> UpdateStatement {
        let model = data.clone();
        let mut stmt = SeaQuery::update();
        stmt.table(CollectionIden::Table)
            .values([
                (CollectionIden::Pid, model.pid.into()),
                (CollectionIden::Kind, model.kind.into()),
                (CollectionIden::Data, model.data.into()),
                (CollectionIden::Timestamp, model.timestamp.into()),
            ])
            .and_where(SeaExpr::col(CollectionIden::Id).eq(data.id()));
        stmt
    }

    fn delete_stmt(
        &self,
        id: &str,
    ) -> DeleteStatement {
        let mut stmt = SeaQuery::delete();
        stmt.from_table(CollectionIden::Table).and_where(SeaExpr::col(CollectionIden::Id).eq(id));
        stmt
    }
}
