//! redlink CLI
//!
//! Connects (optionally over TLS), then either runs a single command or a
//! short demonstration session, printing each reply.

use std::process;

use clap::Parser;
use redlink::{Command, Config, Connection, Pipeline, ProtocolVersion, TlsConfig, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// redlink CLI
#[derive(Parser, Debug)]
#[command(name = "redlink-cli")]
#[command(about = "Talk to a RESP server over TCP or TLS")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(default_value_t = 6379)]
    port: u16,

    /// Use TLS (implied by --cert, --key or --ca)
    #[arg(long)]
    tls: bool,

    /// Client certificate (PEM)
    #[arg(long)]
    cert: Option<String>,

    /// Client private key (PEM)
    #[arg(long)]
    key: Option<String>,

    /// Trusted CA bundle (PEM)
    #[arg(long)]
    ca: Option<String>,

    /// Name to verify the server certificate against
    #[arg(long)]
    sni: Option<String>,

    /// Accept RESP3 reply types
    #[arg(long)]
    resp3: bool,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 1500)]
    connect_timeout_ms: u64,

    /// Read timeout in milliseconds (0 = wait forever)
    #[arg(long, default_value_t = 5000)]
    read_timeout_ms: u64,

    /// Command to run; runs the demo session when omitted
    #[arg(last = true)]
    command: Vec<String>,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,redlink=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder()
        .tcp(&args.host, args.port)
        .connect_timeout_ms(args.connect_timeout_ms)
        .read_timeout_ms(args.read_timeout_ms);
    if args.resp3 {
        builder = builder.protocol(ProtocolVersion::Resp3);
    }
    if args.tls || args.cert.is_some() || args.key.is_some() || args.ca.is_some() {
        builder = builder.tls(TlsConfig {
            cert_file: args.cert.as_ref().map(Into::into),
            key_file: args.key.as_ref().map(Into::into),
            ca_file: args.ca.as_ref().map(Into::into),
            server_name: args.sni.clone(),
        });
    }
    let config = builder.build();

    let mut conn = match Connection::open(config) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Connection error: {}", e);
            process::exit(1);
        }
    };

    let result = if args.command.is_empty() {
        run_demo(&mut conn)
    } else {
        conn.command(&Command::from_argv(&args.command))
            .map(|reply| println!("{}", render(&reply)))
    };

    let summary = conn.close();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    if !summary.is_clean() {
        eprintln!("Closed with {} replies pending", summary.pending_replies);
    }
}

fn run_demo(conn: &mut Connection) -> redlink::Result<()> {
    let reply = conn.command(&Command::new("PING"))?;
    println!("PING: {}", render(&reply));

    let reply = conn.command(&Command::new("SET").arg("foo").arg("hello world"))?;
    println!("SET: {}", render(&reply));

    let reply = conn.command(&binary_set())?;
    println!("SET (binary API): {}", render(&reply));

    let reply = conn.command(&Command::from_line("GET foo"))?;
    println!("GET foo: {}", render(&reply));

    for _ in 0..2 {
        let reply = conn.command(&Command::from_line("INCR counter"))?;
        println!("INCR counter: {}", render(&reply));
    }

    conn.command(&Command::from_line("DEL mylist"))?;

    let mut pipeline = Pipeline::new();
    for j in 0..10 {
        pipeline.add(Command::new("LPUSH").arg("mylist").arg(format!("element-{}", j)));
    }
    pipeline.execute(conn)?;

    let reply = conn.command(&Command::from_line("LRANGE mylist 0 -1"))?;
    if let Some(items) = reply.as_array() {
        for (j, item) in items.iter().enumerate() {
            println!("{}) {}", j, render(item));
        }
    }

    Ok(())
}

/// Render a reply in a compact, redis-cli-like form
/// SET built from length-delimited slices of larger buffers
fn binary_set() -> Command {
    let key = b"bar:ignored";
    let value = b"hello\0world";
    Command::new("SET").arg(&key[..3]).arg(&value[..5])
}

fn render(value: &Value) -> String {
    match value {
        Value::Status(s) => String::from_utf8_lossy(s).into_owned(),
        Value::Error(e) => format!("(error) {}", String::from_utf8_lossy(e)),
        Value::Integer(n) => format!("(integer) {}", n),
        Value::BulkString(b) => format!("\"{}\"", b.escape_ascii()),
        Value::Null => "(nil)".to_string(),
        Value::Double(d) => format!("(double) {}", d),
        Value::Boolean(b) => format!("({})", if *b { "true" } else { "false" }),
        Value::BigNumber(n) => format!("(big number) {}", String::from_utf8_lossy(n)),
        Value::VerbatimString { data, .. } => String::from_utf8_lossy(data).into_owned(),
        Value::Array(items) | Value::Set(items) | Value::Push(items) => {
            let inner: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Map(pairs) => {
            let inner: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{} => {}", render(k), render(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}
