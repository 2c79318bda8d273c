use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{HomepageRecord, HomepageRow, ImageRow, ProjectRecord, ProjectRow, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password_hash, created_at, updated_at
                 FROM users ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// True when another user already holds the given username or email.
    pub fn duplicate_user_exists(&self, username: &str, email: &str, exclude_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE (username = ?1 OR email = ?2) AND id != ?3",
                rusqlite::params![username, email, exclude_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn update_user(&self, id: i64, username: &str, email: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE users SET username = ?1, email = ?2, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?3",
                rusqlite::params![username, email, id],
            )?;
            Ok(changes)
        })
    }

    pub fn update_password(&self, id: i64, password_hash: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE users SET password_hash = ?1, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?2",
                rusqlite::params![password_hash, id],
            )?;
            Ok(changes)
        })
    }

    pub fn delete_user(&self, id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changes)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| count_table(conn, "users"))
    }

    // -- Projects --

    pub fn insert_project(&self, record: &ProjectRecord) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO projects
                 (title, description, image_url, project_url, github_url, technologies, featured)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.title,
                    record.description,
                    record.image_url,
                    record.project_url,
                    record.github_url,
                    record.technologies,
                    record.featured,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_project(&self, id: i64) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, image_url, project_url, github_url,
                        technologies, featured, created_at, updated_at
                 FROM projects WHERE id = ?1",
            )?;
            stmt.query_row([id], project_from_row).optional()
        })
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, image_url, project_url, github_url,
                        technologies, featured, created_at, updated_at
                 FROM projects ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], project_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_project(&self, id: i64, record: &ProjectRecord) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE projects SET
                 title = ?1, description = ?2, image_url = ?3, project_url = ?4,
                 github_url = ?5, technologies = ?6, featured = ?7,
                 updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?8",
                rusqlite::params![
                    record.title,
                    record.description,
                    record.image_url,
                    record.project_url,
                    record.github_url,
                    record.technologies,
                    record.featured,
                    id,
                ],
            )?;
            Ok(changes)
        })
    }

    pub fn delete_project(&self, id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            Ok(changes)
        })
    }

    pub fn count_projects(&self) -> Result<i64> {
        self.with_conn(|conn| count_table(conn, "projects"))
    }

    // -- Homepage --

    /// The singleton row: first by ascending id.
    pub fn get_homepage(&self) -> Result<Option<HomepageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, hero_title, hero_subtitle, about_text, skills,
                        contact_email, contact_phone, social_links, created_at, updated_at
                 FROM homepage ORDER BY id LIMIT 1",
            )?;
            stmt.query_row([], homepage_from_row).optional()
        })
    }

    pub fn insert_homepage(&self, record: &HomepageRecord) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO homepage
                 (hero_title, hero_subtitle, about_text, skills, contact_email,
                  contact_phone, social_links)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.hero_title,
                    record.hero_subtitle,
                    record.about_text,
                    record.skills,
                    record.contact_email,
                    record.contact_phone,
                    record.social_links,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_homepage(&self, id: i64, record: &HomepageRecord) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE homepage SET
                 hero_title = ?1, hero_subtitle = ?2, about_text = ?3, skills = ?4,
                 contact_email = ?5, contact_phone = ?6, social_links = ?7,
                 updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?8",
                rusqlite::params![
                    record.hero_title,
                    record.hero_subtitle,
                    record.about_text,
                    record.skills,
                    record.contact_email,
                    record.contact_phone,
                    record.social_links,
                    id,
                ],
            )?;
            Ok(changes)
        })
    }

    // -- Images --

    pub fn insert_image(
        &self,
        filename: &str,
        original_name: &str,
        mimetype: &str,
        size: i64,
        path: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO images (filename, original_name, mimetype, size, path)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![filename, original_name, mimetype, size, path],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_image(&self, id: i64) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, filename, original_name, mimetype, size, path, created_at
                 FROM images WHERE id = ?1",
            )?;
            stmt.query_row([id], image_from_row).optional()
        })
    }

    pub fn get_image_by_filename(&self, filename: &str) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, filename, original_name, mimetype, size, path, created_at
                 FROM images WHERE filename = ?1",
            )?;
            stmt.query_row([filename], image_from_row).optional()
        })
    }

    pub fn list_images(&self) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, filename, original_name, mimetype, size, path, created_at
                 FROM images ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_image(&self, id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute("DELETE FROM images WHERE id = ?1", [id])?;
            Ok(changes)
        })
    }

    pub fn count_images(&self) -> Result<i64> {
        self.with_conn(|conn| count_table(conn, "images"))
    }
}

// -- Row mapping --

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        project_url: row.get(4)?,
        github_url: row.get(5)?,
        technologies: row.get(6)?,
        featured: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn homepage_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HomepageRow> {
    Ok(HomepageRow {
        id: row.get(0)?,
        hero_title: row.get(1)?,
        hero_subtitle: row.get(2)?,
        about_text: row.get(3)?,
        skills: row.get(4)?,
        contact_email: row.get(5)?,
        contact_phone: row.get(6)?,
        social_links: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn image_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_name: row.get(2)?,
        mimetype: row.get(3)?,
        size: row.get(4)?,
        path: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password_hash, created_at, updated_at
         FROM users WHERE id = ?1",
    )?;
    stmt.query_row([id], user_from_row).optional()
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password_hash, created_at, updated_at
         FROM users WHERE username = ?1",
    )?;
    stmt.query_row([username], user_from_row).optional()
}

fn count_table(conn: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    let count = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_project() -> ProjectRecord {
        ProjectRecord {
            title: "Portfolio Site".into(),
            description: Some("Personal site".into()),
            image_url: None,
            project_url: Some("https://example.com".into()),
            github_url: None,
            technologies: r#"["Rust","SQLite"]"#.into(),
            featured: 1,
        }
    }

    #[test]
    fn project_create_then_get_round_trips() {
        let (_dir, db) = open_test_db();

        let id = db.insert_project(&sample_project()).unwrap();
        let row = db.get_project(id).unwrap().unwrap();

        assert_eq!(row.title, "Portfolio Site");
        assert_eq!(row.technologies.as_deref(), Some(r#"["Rust","SQLite"]"#));
        assert_eq!(row.featured, 1);
    }

    #[test]
    fn project_update_and_delete() {
        let (_dir, db) = open_test_db();

        let id = db.insert_project(&sample_project()).unwrap();
        let mut record = sample_project();
        record.title = "Renamed".into();
        record.featured = 0;

        assert_eq!(db.update_project(id, &record).unwrap(), 1);
        let row = db.get_project(id).unwrap().unwrap();
        assert_eq!(row.title, "Renamed");
        assert_eq!(row.featured, 0);

        assert_eq!(db.delete_project(id).unwrap(), 1);
        assert!(db.get_project(id).unwrap().is_none());

        // Deleting again changes nothing
        assert_eq!(db.delete_project(id).unwrap(), 0);
    }

    #[test]
    fn homepage_is_seeded_and_updates_first_row() {
        let (_dir, db) = open_test_db();

        let seeded = db.get_homepage().unwrap().unwrap();
        assert_eq!(seeded.hero_title.as_deref(), Some("Welcome to My Portfolio"));

        let record = HomepageRecord {
            hero_title: Some("Hello".into()),
            hero_subtitle: None,
            about_text: None,
            skills: r#"["Rust"]"#.into(),
            contact_email: Some("me@example.com".into()),
            contact_phone: None,
            social_links: r#"{"github":"https://github.com/me"}"#.into(),
        };
        assert_eq!(db.update_homepage(seeded.id, &record).unwrap(), 1);

        let row = db.get_homepage().unwrap().unwrap();
        assert_eq!(row.id, seeded.id);
        assert_eq!(row.hero_title.as_deref(), Some("Hello"));
        assert_eq!(row.skills.as_deref(), Some(r#"["Rust"]"#));
        assert_eq!(
            row.social_links.as_deref(),
            Some(r#"{"github":"https://github.com/me"}"#)
        );
    }

    #[test]
    fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();

        // Reopening must not seed a second homepage row
        assert_eq!(
            db.with_conn(|conn| count_table(conn, "homepage")).unwrap(),
            1
        );
    }

    #[test]
    fn user_crud_and_duplicate_check() {
        let (_dir, db) = open_test_db();

        let id = db.create_user("alice", "alice@example.com", "digest").unwrap();
        let other = db.create_user("bob", "bob@example.com", "digest").unwrap();

        assert!(db.get_user_by_username("alice").unwrap().is_some());
        assert!(db.duplicate_user_exists("alice", "x@example.com", other).unwrap());
        assert!(!db.duplicate_user_exists("alice", "alice@example.com", id).unwrap());

        assert_eq!(db.update_user(id, "alice2", "alice2@example.com").unwrap(), 1);
        let row = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(row.username, "alice2");

        assert_eq!(db.update_password(id, "digest2").unwrap(), 1);
        assert_eq!(
            db.get_user_by_id(id).unwrap().unwrap().password_hash,
            "digest2"
        );

        assert_eq!(db.delete_user(id).unwrap(), 1);
        assert!(db.get_user_by_id(id).unwrap().is_none());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn image_insert_lookup_delete() {
        let (_dir, db) = open_test_db();

        let id = db
            .insert_image("image-1-42.png", "cat.png", "image/png", 123, "/tmp/image-1-42.png")
            .unwrap();

        let by_name = db.get_image_by_filename("image-1-42.png").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.mimetype, "image/png");

        assert_eq!(db.list_images().unwrap().len(), 1);
        assert_eq!(db.delete_image(id).unwrap(), 1);
        assert!(db.get_image(id).unwrap().is_none());
        assert_eq!(db.count_images().unwrap(), 0);
    }
}
