//! Path traversal: index and default members, transitions consuming path
//! segments, keyword input from the query string and variadic parameters.

use arbor_core::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn text(body: &'static str) -> Leaf {
    Endpoint::page(
        Signature::empty(),
        leaf_fn(move |_, _| Box::pin(async move { Ok(Reply::from(body)) })),
    )
}

async fn resolve(site: &Site, uri: &str) -> Result<String, Error> {
    let reply = site.resolve(Request::get(uri)).await?;
    Ok(reply.as_text().unwrap_or_default().to_string())
}

async fn dispatch(site: &Site, uri: &str) -> String {
    let response = site.dispatch(Request::get(uri)).await;
    response.body_str().unwrap_or_default().to_string()
}

fn joined(values: &[Value], sep: &str) -> String {
    values.iter().map(Value::to_string).collect::<Vec<_>>().join(sep)
}

fn keywords(extra: &BTreeMap<String, Value>) -> String {
    let pairs: Vec<String> = extra.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", pairs.join(", "))
}

// =============================================================================
// Forum tree
// =============================================================================

fn forum(id: i64) -> Result<Arc<dyn Resource>, Error> {
    ResourceTable::builder()
        .leaf(
            "index",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(move |_, _| {
                    Box::pin(async move { Ok(Reply::text(format!("forum({id}).index"))) })
                }),
            ),
        )
        .leaf(
            "new_topic",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(move |_, _| {
                    Box::pin(async move { Ok(Reply::text(format!("forum({id}).new_topic"))) })
                }),
            ),
        )
        .leaf(
            "topic",
            Endpoint::page(
                Signature::compile([
                    Parameter::int("topic"),
                    Parameter::keyword("offset").coerce(ScalarType::Int).default(0),
                    Parameter::keyword("num").coerce(ScalarType::Int).default(10),
                ])?,
                leaf_fn(move |_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "forum({id}).topic({})[{}:{}]",
                            args.int("topic")?,
                            args.int("offset")?,
                            args.int("num")?
                        )))
                    })
                }),
            ),
        )
        .build()
}

fn forum_site() -> Site {
    let root = ResourceTable::builder()
        .leaf("index", text("index"))
        .leaf("about", text("about"))
        .leaf("forums", text("forums"))
        .transition(
            "forum",
            Endpoint::transition(
                Signature::compile([Parameter::int("id").default(Value::Null)]).unwrap(),
                transition_fn(|_, args| {
                    Box::pin(async move {
                        match args.opt_int("id")? {
                            Some(id) => forum(id),
                            None => Err(Error::rewrite("/forums")),
                        }
                    })
                }),
            ),
        )
        .leaf(
            "no_annotation",
            Endpoint::page(
                Signature::compile([Parameter::positional("val").default("default")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move { Ok(Reply::text(format!("na:{}", args.value("val")?))) })
                }),
            ),
        )
        .leaf(
            "request",
            Endpoint::page(
                Signature::compile([Parameter::sticker::<Request>("req")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        let req = args.sticker::<Request>("req")?;
                        Ok(Reply::text(req.uri().to_string()))
                    })
                }),
            ),
        )
        .build()
        .unwrap();
    Site::new([root])
}

#[tokio::test]
async fn test_index_and_pages() {
    let site = forum_site();
    assert_eq!(resolve(&site, "/").await.unwrap(), "index");
    assert_eq!(resolve(&site, "/about").await.unwrap(), "about");
    assert_eq!(resolve(&site, "/about/").await.unwrap(), "about");
}

#[tokio::test]
async fn test_trailing_segment_is_not_found() {
    let site = forum_site();
    assert!(matches!(resolve(&site, "/about/test").await, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_request_sticker() {
    let site = forum_site();
    assert_eq!(resolve(&site, "/request?x=1").await.unwrap(), "/request?x=1");
}

#[tokio::test]
async fn test_untyped_default() {
    let site = forum_site();
    assert_eq!(resolve(&site, "/no_annotation").await.unwrap(), "na:default");
    assert_eq!(resolve(&site, "/no_annotation/val").await.unwrap(), "na:val");
}

#[tokio::test]
async fn test_transition_redirect() {
    let site = forum_site();
    assert_eq!(dispatch(&site, "/forum").await, "forums");
    assert_eq!(dispatch(&site, "/forum/").await, "forums");
}

#[tokio::test]
async fn test_transition_argument_from_path_or_query() {
    let site = forum_site();
    for uri in ["/forum/10", "/forum/10/", "/forum?id=10", "/forum/?id=10"] {
        assert_eq!(resolve(&site, uri).await.unwrap(), "forum(10).index", "{uri}");
    }
}

#[tokio::test]
async fn test_transition_argument_conflicts() {
    let site = forum_site();
    assert!(matches!(resolve(&site, "/forum/10?id=10").await, Err(Error::NotFound)));
    assert!(matches!(resolve(&site, "/forum/test").await, Err(Error::NotFound)));
    assert!(matches!(resolve(&site, "/forum/10/10").await, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_nested_members() {
    let site = forum_site();
    assert_eq!(
        resolve(&site, "/forum/11/new_topic").await.unwrap(),
        "forum(11).new_topic"
    );
    assert_eq!(
        resolve(&site, "/forum/11/new_topic/").await.unwrap(),
        "forum(11).new_topic"
    );
}

#[tokio::test]
async fn test_nested_arguments_and_keywords() {
    let site = forum_site();
    let cases = [
        ("/forum/12/topic/10", "forum(12).topic(10)[0:10]"),
        ("/forum/12/topic/10?offset=10", "forum(12).topic(10)[10:10]"),
        ("/forum/12/topic/10?offset=20&num=20", "forum(12).topic(10)[20:20]"),
        ("/forum/12/topic?topic=13&offset=20&num=20", "forum(12).topic(13)[20:20]"),
    ];
    for (uri, expected) in cases {
        assert_eq!(resolve(&site, uri).await.unwrap(), expected, "{uri}");
    }
    assert!(matches!(
        resolve(&site, "/forum/12/topic/10/10").await,
        Err(Error::NotFound)
    ));
}

// =============================================================================
// Default members
// =============================================================================

fn default_site() -> Site {
    let one = ResourceTable::builder()
        .leaf("index", text("one_index"))
        .leaf(
            "default",
            Endpoint::page(
                Signature::compile([Parameter::positional("one")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move { Ok(Reply::text(format!("one:{}", args.value("one")?))) })
                }),
            ),
        )
        .build()
        .unwrap();
    let star = ResourceTable::builder()
        .leaf(
            "default",
            Endpoint::page(
                Signature::compile([Parameter::var_positional("star")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!("star:{}", joined(args.rest(), ":"))))
                    })
                }),
            ),
        )
        .build()
        .unwrap();
    let onestar = ResourceTable::builder()
        .leaf(
            "default",
            Endpoint::page(
                Signature::compile([
                    Parameter::positional("one"),
                    Parameter::var_positional("star"),
                ])
                .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "onestar({}):{}",
                            args.value("one")?,
                            joined(args.rest(), ":")
                        )))
                    })
                }),
            ),
        )
        .build()
        .unwrap();

    let root = ResourceTable::builder()
        .leaf("default", text("root_default"))
        .child("one", one)
        .child("star", star)
        .child("onestar", onestar)
        .build()
        .unwrap();
    Site::new([root])
}

#[tokio::test]
async fn test_default_without_argument_is_not_found() {
    let site = default_site();
    for uri in ["/", "/star", "/onestar"] {
        assert!(matches!(resolve(&site, uri).await, Err(Error::NotFound)), "{uri}");
    }
}

#[tokio::test]
async fn test_default_receives_unresolved_segment() {
    let site = default_site();
    assert_eq!(resolve(&site, "/one/arg").await.unwrap(), "one:arg");
    assert_eq!(resolve(&site, "/one").await.unwrap(), "one_index");
    assert!(matches!(resolve(&site, "/one/arg/test").await, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_variadic_default() {
    let site = default_site();
    assert_eq!(resolve(&site, "/star/a").await.unwrap(), "star:a");
    assert_eq!(resolve(&site, "/star/a/b").await.unwrap(), "star:a:b");
    assert_eq!(resolve(&site, "/onestar/a").await.unwrap(), "onestar(a):");
    assert_eq!(resolve(&site, "/onestar/a/b").await.unwrap(), "onestar(a):b");
    assert_eq!(resolve(&site, "/onestar/a/b/c").await.unwrap(), "onestar(a):b:c");
}

// =============================================================================
// Map resources
// =============================================================================

fn about() -> Arc<dyn Resource> {
    ResourceTable::builder()
        .leaf("index", text("blank"))
        .leaf(
            "more",
            Endpoint::page(
                Signature::compile([Parameter::str("page")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move { Ok(Reply::text(format!("PAGE:{}", args.str("page")?))) })
                }),
            ),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_map_resource_root() {
    let root: MapResource = [("about", about())].into_iter().collect();
    let site = Site::new([Arc::new(root) as Arc<dyn Resource>]);

    assert_eq!(resolve(&site, "/about").await.unwrap(), "blank");
    assert!(matches!(resolve(&site, "/about/more").await, Err(Error::NotFound)));
    assert!(matches!(resolve(&site, "/about/more/").await, Err(Error::NotFound)));
    assert_eq!(resolve(&site, "/about/more/abc").await.unwrap(), "PAGE:abc");
}

// =============================================================================
// Variadic keywords
// =============================================================================

fn varkw_site() -> Site {
    let root = ResourceTable::builder()
        .leaf(
            "justkw",
            Endpoint::page(
                Signature::compile([Parameter::var_keyword("kw")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!("justkw:{}", keywords(args.extra()))))
                    })
                }),
            ),
        )
        .leaf(
            "kwargkw",
            Endpoint::page(
                Signature::compile([Parameter::keyword("a"), Parameter::var_keyword("kw")])
                    .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "kwargkw:{}:{}",
                            args.value("a")?,
                            keywords(args.extra())
                        )))
                    })
                }),
            ),
        )
        .leaf(
            "poskw",
            Endpoint::page(
                Signature::compile([Parameter::positional("a"), Parameter::var_keyword("kw")])
                    .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "poskw:{}:{}",
                            args.value("a")?,
                            keywords(args.extra())
                        )))
                    })
                }),
            ),
        )
        .leaf(
            "varposkw",
            Endpoint::page(
                Signature::compile([
                    Parameter::var_positional("a"),
                    Parameter::var_keyword("kw"),
                ])
                .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "varposkw:{}:{}",
                            joined(args.rest(), ","),
                            keywords(args.extra())
                        )))
                    })
                }),
            ),
        )
        .build()
        .unwrap();
    Site::new([root])
}

#[tokio::test]
async fn test_var_keyword_collects_query() {
    let site = varkw_site();
    assert_eq!(resolve(&site, "/justkw").await.unwrap(), "justkw:{}");
    assert_eq!(resolve(&site, "/justkw?a=1").await.unwrap(), "justkw:{a=1}");
}

#[tokio::test]
async fn test_named_keywords_leave_the_rest() {
    let site = varkw_site();
    assert_eq!(
        resolve(&site, "/kwargkw?a=1&b=2").await.unwrap(),
        "kwargkw:1:{b=2}"
    );
    assert_eq!(resolve(&site, "/poskw/a?b=2").await.unwrap(), "poskw:a:{b=2}");
    assert_eq!(resolve(&site, "/poskw?a=1&b=2").await.unwrap(), "poskw:1:{b=2}");
    assert_eq!(
        resolve(&site, "/varposkw/a/b/c?b=2").await.unwrap(),
        "varposkw:a,b,c:{b=2}"
    );
}
