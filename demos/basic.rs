use rqlite_http::{BatchStatement, Connection, Params, Value};

fn main() -> anyhow::Result<()> {
    let dsn = std::env::var("RQLITE_DSN").unwrap_or_else(|_| "rqlite:".to_owned());
    let mut conn = Connection::open(&dsn)?;

    conn.exec(
        "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
    )?;

    let mut insert = conn.prepare("INSERT INTO users (name) VALUES (?)");
    for name in ["Kit", "Ada"] {
        insert.bind([Value::text(name)]);
        insert.execute()?;
    }
    println!("last id: {}", conn.last_insert_id(Some("users")));

    conn.transaction_raw([
        BatchStatement::new("INSERT INTO users (name) VALUES (?)", [Value::text("Grace")]),
        BatchStatement::from(format!(
            "UPDATE users SET name = {} WHERE name = 'Kit'",
            conn.quote("Kit O'Neil")
        )),
    ])?;

    conn.set_consistency("weak");
    let mut select = conn.prepare("SELECT id, name FROM users WHERE name != :name");
    select.bind(Params::named([("name", Value::text("nobody"))]));
    for row in select.execute()? {
        println!("{:?} {:?}", row.get_i64("id"), row.get_text("name"));
    }

    Ok(())
}
