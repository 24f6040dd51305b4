use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use hearth_registry::{Home, HomeStore, OwnerId, Position, StoreError};
use parking_lot::Mutex;
use rusqlite::{Connection, params};

const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS homes (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	owner TEXT NOT NULL,
	name TEXT NOT NULL,
	world TEXT NOT NULL,
	x REAL NOT NULL,
	y REAL NOT NULL,
	z REAL NOT NULL,
	yaw REAL NOT NULL,
	pitch REAL NOT NULL,
	created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS homes_owner ON homes(owner);
";

/// SQLite-backed [`HomeStore`].
///
/// The row id is store-assigned and never leaves this module; it only fixes
/// the load order, which makes duplicate folded names resolve
/// deterministically when the registry partitions the result. The
/// connection sits behind a mutex, though in practice the registry already
/// serializes the two bulk calls.
pub struct SqliteStore {
	conn: Mutex<Connection>,
}

impl SqliteStore {
	/// Opens (creating if needed) the database at `path` and ensures the
	/// schema exists.
	pub fn open(path: &Path) -> Result<Self, StoreError> {
		let conn = Connection::open(path).map_err(db_err("failed to open home database"))?;
		Self::from_connection(conn)
	}

	/// A private in-memory database, mostly useful in tests.
	pub fn open_in_memory() -> Result<Self, StoreError> {
		let conn = Connection::open_in_memory().map_err(db_err("failed to open home database"))?;
		Self::from_connection(conn)
	}

	fn from_connection(conn: Connection) -> Result<Self, StoreError> {
		conn.busy_timeout(BUSY_TIMEOUT)
			.map_err(db_err("failed to configure home database"))?;
		conn.execute_batch(SCHEMA)
			.map_err(db_err("failed to ensure home schema"))?;
		Ok(Self {
			conn: Mutex::new(conn),
		})
	}
}

impl HomeStore for SqliteStore {
	fn load_all(&self) -> Result<Vec<Home>, StoreError> {
		let conn = self.conn.lock();
		let mut select = conn
			.prepare(
				"SELECT owner, name, world, x, y, z, yaw, pitch, created_at \
				 FROM homes ORDER BY id",
			)
			.map_err(db_err("failed to query homes"))?;

		let rows = select
			.query_map([], |row| {
				Ok((
					row.get::<_, String>(0)?,
					row.get::<_, String>(1)?,
					row.get::<_, String>(2)?,
					row.get::<_, f64>(3)?,
					row.get::<_, f64>(4)?,
					row.get::<_, f64>(5)?,
					row.get::<_, f64>(6)?,
					row.get::<_, f64>(7)?,
					row.get::<_, i64>(8)?,
				))
			})
			.map_err(db_err("failed to query homes"))?;

		let mut homes = Vec::new();
		for row in rows {
			let (owner, name, world, x, y, z, yaw, pitch, created_at_ms) =
				row.map_err(db_err("failed to read a home row"))?;
			let owner = OwnerId::from_str(&owner)
				.map_err(|error| StoreError::with_source("malformed owner id in store", error))?;
			homes.push(Home {
				owner,
				name,
				position: Position {
					world,
					x,
					y,
					z,
					yaw: yaw as f32,
					pitch: pitch as f32,
				},
				created_at_ms,
			});
		}
		tracing::debug!(count = homes.len(), "store.load");
		Ok(homes)
	}

	fn replace_all(&self, homes: &[Home]) -> Result<(), StoreError> {
		let mut conn = self.conn.lock();
		let tx = conn
			.transaction()
			.map_err(db_err("failed to begin save transaction"))?;
		tx.execute("DELETE FROM homes", [])
			.map_err(db_err("failed to clear homes"))?;
		{
			let mut insert = tx
				.prepare(
					"INSERT INTO homes (owner, name, world, x, y, z, yaw, pitch, created_at) \
					 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
				)
				.map_err(db_err("failed to prepare home insert"))?;
			for home in homes {
				insert
					.execute(params![
						home.owner.to_string(),
						home.name,
						home.position.world,
						home.position.x,
						home.position.y,
						home.position.z,
						f64::from(home.position.yaw),
						f64::from(home.position.pitch),
						home.created_at_ms,
					])
					.map_err(db_err("failed to insert a home"))?;
			}
		}
		tx.commit().map_err(db_err("failed to commit save transaction"))?;
		tracing::debug!(count = homes.len(), "store.replace");
		Ok(())
	}
}

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
	move |error| StoreError::with_source(context, error)
}
