use anyhow::Context;
use rusqlite::Connection;

// Migrations are embedded so that in-memory test databases get the full
// schema without touching the filesystem.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_barbers",
        "CREATE TABLE IF NOT EXISTS barbers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            bio TEXT,
            specialty TEXT,
            photo_url TEXT,
            api_token TEXT UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
    (
        "002_services",
        "CREATE TABLE IF NOT EXISTS services (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            price REAL NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );",
    ),
    (
        "003_working_hours",
        "CREATE TABLE IF NOT EXISTS working_hours (
            barber_id TEXT NOT NULL REFERENCES barbers(id),
            weekday INTEGER NOT NULL CHECK (weekday BETWEEN 0 AND 6),
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (barber_id, weekday)
        );",
    ),
    (
        "004_reservations",
        "CREATE TABLE IF NOT EXISTS reservations (
            id TEXT PRIMARY KEY,
            barber_id TEXT NOT NULL REFERENCES barbers(id),
            service_id TEXT NOT NULL REFERENCES services(id),
            client_name TEXT NOT NULL,
            client_email TEXT NOT NULL,
            client_phone TEXT NOT NULL,
            start_at TEXT NOT NULL,
            end_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'tentative',
            payment_status TEXT NOT NULL DEFAULT 'unpaid',
            payment_session_id TEXT,
            payment_ref TEXT,
            amount_paid REAL,
            notes TEXT,
            expires_at TEXT,
            reminder_sent_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reservations_barber_start
            ON reservations(barber_id, start_at);
        CREATE INDEX IF NOT EXISTS idx_reservations_status
            ON reservations(status);",
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
