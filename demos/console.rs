//! Console demo - print the headers a request handler would send.
//!
//! This example demonstrates:
//! - Building an emitter with the builder pattern
//! - Logging values, groups, tables and dumps
//! - Objects with private members and a cycle
//! - Exceptions with a trace
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=wildfire_client=debug cargo run --example console
//! ```

use tracing_subscriber::EnvFilter;
use wildfire_client::console::GroupOptions;
use wildfire_client::trace::{ExceptionInfo, Frame};
use wildfire_client::transport::MemoryTransport;
use wildfire_client::value::{FieldDescriptor, Object, TypeDescriptor, Value};
use wildfire_client::EmitterBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut console = EmitterBuilder::new()
        .backtrace(|| vec![Frame::new("handle_request").at("/srv/app/src/routes.rs", 48)])
        .build(MemoryTransport::new());

    console.group("Request", &GroupOptions::new().color("#36c"))?;
    console.info("GET /users/7", Some("route"))?;
    console.dump("user_id", 7)?;
    console.group_end()?;

    // A user with a private field and a link back to itself.
    let user_type = TypeDescriptor::new("User")
        .field(FieldDescriptor::public("name"))
        .field(FieldDescriptor::private("password_hash"))
        .field(FieldDescriptor::public("manager"))
        .shared();
    let user = Object::new(&user_type);
    user.set("name", "ada");
    user.set("password_hash", "$argon2id$...");
    user.set("manager", user.clone());
    console.log(user, Some("user"))?;

    console.table(
        "2 queries",
        Value::seq([
            Value::seq(["SQL", "ms"]),
            Value::seq([Value::from("SELECT * FROM users WHERE id = ?"), Value::Float(0.8)]),
            Value::seq([Value::from("SELECT * FROM roles"), Value::Float(1.3)]),
        ]),
    )?;

    let error = ExceptionInfo::new("NotFound", "no avatar for user 7")
        .at("/srv/app/src/avatar.rs", 19)
        .with_trace(vec![
            Frame::new("load_avatar").at("/srv/app/src/avatar.rs", 19),
            Frame::new("handle_request").at("/srv/app/src/routes.rs", 48),
        ]);
    console.exception(&error, None)?;
    console.trace("done")?;

    for (name, value) in console.transport().headers() {
        println!("{}: {}", name, value);
    }
    Ok(())
}
