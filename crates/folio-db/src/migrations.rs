use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT UNIQUE NOT NULL,
            email           TEXT UNIQUE NOT NULL,
            password_hash   TEXT NOT NULL,
            created_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS projects (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            description     TEXT,
            image_url       TEXT,
            project_url     TEXT,
            github_url      TEXT,
            technologies    TEXT,
            featured        BOOLEAN NOT NULL DEFAULT 0,
            created_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS homepage (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            hero_title      TEXT,
            hero_subtitle   TEXT,
            about_text      TEXT,
            skills          TEXT,
            contact_email   TEXT,
            contact_phone   TEXT,
            social_links    TEXT,
            created_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS images (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            filename        TEXT NOT NULL,
            original_name   TEXT NOT NULL,
            mimetype        TEXT NOT NULL,
            size            INTEGER NOT NULL,
            path            TEXT NOT NULL,
            created_at      DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Seed the singleton homepage row; all reads and writes address
        -- the first row by ascending id.
        INSERT INTO homepage (hero_title, hero_subtitle, about_text)
            SELECT 'Welcome to My Portfolio', 'Full Stack Developer', 'About me section...'
            WHERE NOT EXISTS (SELECT 1 FROM homepage);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
