// Small site dispatched in-process
//
// Run with: cargo run --example site
// Override settings with e.g. ARBOR_LOG__LEVEL=debug

use arbor::prelude::*;
use std::sync::Arc;

fn page(body: &'static str) -> Leaf {
    Endpoint::page(
        Signature::empty(),
        leaf_fn(move |_, _| Box::pin(async move { Ok(Reply::from(body)) })),
    )
}

fn child() -> Result<Arc<dyn Resource>, Error> {
    ResourceTable::builder()
        .leaf("page1", page("page1"))
        .leaf("page2", page("page2"))
        .leaf(
            "index",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(|_, _| Box::pin(async { Err(Error::rewrite("/child/page1")) })),
            ),
        )
        .build()
}

fn root() -> Result<Arc<dyn Resource>, Error> {
    ResourceTable::builder()
        .child("child", child()?)
        .leaf("index", page("Index Page"))
        .leaf("hello", page("Hello world"))
        .leaf(
            "hello_user",
            Endpoint::page(
                Signature::compile([Parameter::str("user")])?,
                leaf_fn(|_, args| {
                    Box::pin(async move { Ok(Reply::text(format!("Hello {}!", args.str("user")?))) })
                }),
            ),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = arbor_config::load_site_settings(None)?;
    let _guard = settings.log_config().init()?;

    let site = settings.apply(Site::builder().root(root()?)).build();

    println!("Arbor site example");
    println!("==================\n");

    for uri in [
        "/",
        "/hello",
        "/hello_user/ada",
        "/hello_user?user=grace",
        "/hello_user",
        "/child",
        "/child/page2",
        "/missing",
    ] {
        let response = site.dispatch(Request::get(uri)).await;
        println!(
            "GET {uri:<24} -> {} {}",
            response.status,
            response.body_str().unwrap_or("<binary>")
        );
    }

    Ok(())
}
