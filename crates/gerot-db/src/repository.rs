use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use gerot_core::Role;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::{password, Error, Result};

pub const DEFAULT_SECTORS: [(&str, &str); 5] = [
    ("Administrativo", "Setor administrativo"),
    ("Comercial", "Setor comercial e vendas"),
    ("Operacional", "Setor operacional e logística"),
    ("Financeiro", "Setor financeiro"),
    ("TI", "Tecnologia da informação"),
];

pub const DEFAULT_RPA_TYPES: [(&str, &str, &str); 8] = [
    ("Data Extraction", "Extract data from the remote database", "database"),
    ("File Processing", "Process and transform files", "file"),
    ("System Integration", "Integrate with external systems", "link"),
    ("Report Delivery", "Generate and deliver reports", "report"),
    ("Monitoring", "Monitor systems and data sources", "monitor"),
    ("Data Backup", "Copy data to backup storage", "archive"),
    ("Web Scraping", "Collect data from web pages", "globe"),
    ("Email Automation", "Send automated emails", "mail"),
];

pub const DEFAULT_ADMIN_USERNAME: &str = "admin_master";

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create new database connection
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens its own database, so keep a single one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Connects to a private in-memory database with the schema created.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::new("sqlite::memory:").await?;
        db.init_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Initialize database schema
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sectors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                leader_email TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT UNIQUE,
                password_hash TEXT,
                full_name TEXT,
                role TEXT NOT NULL DEFAULT 'colaborador'
                    CHECK (role IN ('admin_master', 'lider', 'colaborador')),
                sector_id INTEGER REFERENCES sectors(id),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                first_login BOOLEAN NOT NULL DEFAULT 1,
                last_login TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                revoked_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS routines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                sector_id INTEGER REFERENCES sectors(id),
                title TEXT NOT NULL,
                description TEXT,
                date DATE NOT NULL,
                start_time TEXT,
                end_time TEXT,
                priority INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'completed', 'cancelled')),
                created_by INTEGER REFERENCES users(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checklists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                routine_id INTEGER NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
                task TEXT NOT NULL,
                completed BOOLEAN NOT NULL DEFAULT 0,
                break_type TEXT CHECK (break_type IN ('rest', 'lunch', 'meeting', 'training')),
                priority INTEGER NOT NULL DEFAULT 1 CHECK (priority IN (1, 2, 3)),
                estimated_minutes INTEGER,
                completed_at TEXT,
                completed_by INTEGER REFERENCES users(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activity_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER REFERENCES users(id),
                action TEXT NOT NULL,
                details TEXT,
                ip_address TEXT,
                user_agent TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sector_id INTEGER NOT NULL REFERENCES sectors(id),
                title TEXT NOT NULL,
                description TEXT,
                target_value REAL,
                current_value REAL NOT NULL DEFAULT 0,
                unit TEXT,
                deadline DATE,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'completed', 'cancelled')),
                created_by INTEGER REFERENCES users(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                is_read BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_rpa_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                icon TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_rpas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                rpa_type_id INTEGER REFERENCES agent_rpa_types(id),
                priority TEXT NOT NULL DEFAULT 'medium'
                    CHECK (priority IN ('critical', 'high', 'medium', 'low')),
                frequency TEXT,
                parameters TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'running', 'completed', 'failed')),
                result TEXT,
                error_message TEXT,
                created_by INTEGER REFERENCES users(id),
                executed_at TEXT,
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_dashboard_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL DEFAULT 'general',
                chart_types TEXT,
                filters TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
                result_data TEXT,
                error_message TEXT,
                created_by INTEGER REFERENCES users(id),
                processed_at TEXT,
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action_type TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id INTEGER,
                user_id INTEGER REFERENCES users(id),
                details TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_dashboard_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL DEFAULT 'Outros',
                query_config TEXT,
                charts_config TEXT,
                layout_config TEXT,
                is_published BOOLEAN NOT NULL DEFAULT 0,
                is_public BOOLEAN NOT NULL DEFAULT 0,
                created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS room_bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                room TEXT NOT NULL,
                title TEXT NOT NULL,
                date DATE NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                participants INTEGER NOT NULL CHECK (participants > 0),
                subject TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (end_time > start_time)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS environments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                icon TEXT,
                capacity INTEGER,
                area_m2 REAL,
                floor INTEGER NOT NULL DEFAULT 1,
                display_order INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS environment_resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                environment_id INTEGER NOT NULL REFERENCES environments(id) ON DELETE CASCADE,
                resource_type TEXT NOT NULL
                    CHECK (resource_type IN ('model_3d', 'plant_2d', 'photo', 'document')),
                file_name TEXT NOT NULL,
                file_url TEXT NOT NULL,
                file_size INTEGER,
                mime_type TEXT,
                description TEXT,
                is_primary BOOLEAN NOT NULL DEFAULT 0,
                display_order INTEGER NOT NULL DEFAULT 0,
                uploaded_by INTEGER REFERENCES users(id),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes
        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_users_sector ON users(sector_id)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_routines_user_date ON routines(user_id, date)",
            "CREATE INDEX IF NOT EXISTS idx_routines_sector_date ON routines(sector_id, date)",
            "CREATE INDEX IF NOT EXISTS idx_checklists_routine ON checklists(routine_id)",
            "CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_logs(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read)",
            "CREATE INDEX IF NOT EXISTS idx_agent_rpas_status ON agent_rpas(status)",
            "CREATE INDEX IF NOT EXISTS idx_dashboard_requests_status ON agent_dashboard_requests(status)",
            "CREATE INDEX IF NOT EXISTS idx_dashboard_templates_owner ON agent_dashboard_templates(created_by)",
            "CREATE INDEX IF NOT EXISTS idx_room_bookings_room_date ON room_bookings(room, date)",
            "CREATE INDEX IF NOT EXISTS idx_environment_resources_env ON environment_resources(environment_id)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    // ========================================================================
    // Seed data
    // ========================================================================

    /// Inserts default sectors, RPA types and the `admin_master` account when absent.
    pub async fn seed_defaults(&self, admin_password: &str) -> Result<()> {
        let now = Utc::now();

        for (name, description) in DEFAULT_SECTORS {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO sectors (name, description, is_active, created_at, updated_at)
                VALUES (?, ?, 1, ?, ?)
                "#,
            )
            .bind(name)
            .bind(description)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }

        for (name, description, icon) in DEFAULT_RPA_TYPES {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO agent_rpa_types (name, description, icon, is_active, created_at)
                VALUES (?, ?, ?, 1, ?)
                "#,
            )
            .bind(name)
            .bind(description)
            .bind(icon)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }

        if self.get_user_by_username(DEFAULT_ADMIN_USERNAME).await?.is_none() {
            let hash = password::hash_password(admin_password)?;
            let admin_sector: Option<i64> =
                sqlx::query_scalar("SELECT id FROM sectors WHERE name = 'Administrativo'")
                    .fetch_optional(&self.pool)
                    .await?;

            sqlx::query(
                r#"
                INSERT INTO users (
                    username, password_hash, full_name, role, sector_id,
                    is_active, first_login, created_at, updated_at
                )
                VALUES (?, ?, 'Administrador Master', 'admin_master', ?, 1, 1, ?, ?)
                "#,
            )
            .bind(DEFAULT_ADMIN_USERNAME)
            .bind(hash)
            .bind(admin_sector)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

            tracing::warn!(
                "Created default '{}' user; change its password on first login",
                DEFAULT_ADMIN_USERNAME
            );
        }

        Ok(())
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Rewrites role names left by older schema versions. Returns the number of users changed.
    pub async fn migrate_legacy_roles(&self) -> Result<u64> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, role FROM users")
            .fetch_all(&self.pool)
            .await?;

        let mut migrated = 0;
        for (id, stored) in rows {
            match Role::from_legacy(&stored) {
                Some(role) if role.as_str() != stored => {
                    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
                        .bind(role.as_str())
                        .bind(Utc::now())
                        .bind(id)
                        .execute(&self.pool)
                        .await?;
                    tracing::info!(user_id = id, from = %stored, to = %role, "Migrated role");
                    migrated += 1;
                }
                Some(_) => {}
                None => tracing::warn!(user_id = id, role = %stored, "Unknown role left untouched"),
            }
        }

        Ok(migrated)
    }

    /// Writes a consistent copy of the database to `path`, which must not exist yet.
    pub async fn backup_to(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Conflict(format!("{} already exists", path.display())));
        }
        let target = path
            .to_str()
            .ok_or_else(|| Error::Validation("backup path is not valid UTF-8".to_string()))?;

        sqlx::query("VACUUM INTO ?")
            .bind(target)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Runs a trivial query; used by health checks.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
