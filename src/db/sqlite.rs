// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across network awaits.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{
    AppliedChanges, ChangeSet, InsertOutcome, Post, PostCounts, TrackedAccount, WindowChanges,
};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_scan_state(&conn, key)
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_scan_state(&conn, key, value)
    }

    async fn register_account(&self, account: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::register_account(&conn, account)
    }

    async fn is_tracked(&self, account: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::is_tracked(&conn, account)
    }

    async fn tracked_accounts(&self) -> Result<Vec<TrackedAccount>> {
        let conn = self.conn.lock().await;
        super::queries::tracked_accounts(&conn)
    }

    async fn insert_post(&self, post: &Post) -> Result<InsertOutcome> {
        let conn = self.conn.lock().await;
        super::queries::insert_post(&conn, post)
    }

    async fn mark_deleted(&self, post_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::mark_deleted(&conn, post_id)
    }

    async fn query_posts_since(&self, account: &str, min_post_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn.lock().await;
        super::queries::query_posts_since(&conn, account, min_post_id)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        let conn = self.conn.lock().await;
        super::queries::get_post(&conn, post_id)
    }

    async fn post_counts(&self, account: &str) -> Result<PostCounts> {
        let conn = self.conn.lock().await;
        super::queries::post_counts(&conn, account)
    }

    async fn apply_changes(&self, changes: &ChangeSet) -> Result<AppliedChanges> {
        let mut conn = self.conn.lock().await;
        super::queries::apply_changes(&mut conn, changes)
    }

    async fn reconcile_window(
        &self,
        account: &str,
        boundary_id: i64,
        plan: &(dyn for<'p> Fn(&'p [Post]) -> ChangeSet + Sync),
    ) -> Result<WindowChanges> {
        let mut conn = self.conn.lock().await;
        super::queries::reconcile_window(&mut conn, account, boundary_id, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    async fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    fn post(id: i64) -> Post {
        Post {
            owner_account: "alice".to_string(),
            text: "hello".to_string(),
            raw_text: "hello".to_string(),
            post_id: id,
            deleted: false,
            repost_source: None,
        }
    }

    #[tokio::test]
    async fn test_trait_scan_state_roundtrip() {
        let db = test_db().await;
        assert_eq!(db.get_scan_state("cursor").await.unwrap(), None);
        db.set_scan_state("cursor", "abc123").await.unwrap();
        assert_eq!(
            db.get_scan_state("cursor").await.unwrap(),
            Some("abc123".to_string())
        );
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = test_db().await;
        assert_eq!(db.table_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_trait_register_and_list() {
        let db = test_db().await;
        assert!(db.register_account("bob").await.unwrap());
        assert!(db.register_account("alice").await.unwrap());
        assert!(!db.register_account("alice").await.unwrap());
        let names: Vec<String> = db
            .tracked_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.account)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_trait_post_lifecycle() {
        let db = test_db().await;
        assert_eq!(
            db.insert_post(&post(42)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            db.insert_post(&post(42)).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert!(db.mark_deleted(42).await.unwrap());
        let stored = db.get_post(42).await.unwrap().unwrap();
        assert!(stored.deleted);
        assert_eq!(db.query_posts_since("alice", 42).await.unwrap().len(), 1);
        assert!(db.query_posts_since("alice", 43).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trait_apply_changes() {
        let db = test_db().await;
        db.insert_post(&post(1)).await.unwrap();
        let applied = db
            .apply_changes(&ChangeSet {
                inserts: vec![post(2)],
                deletions: vec![1],
            })
            .await
            .unwrap();
        assert_eq!(applied.inserted, 1);
        assert_eq!(applied.marked_deleted, 1);
        let counts = db.post_counts("alice").await.unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.deleted, 1);
    }
}
