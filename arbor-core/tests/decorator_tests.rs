//! Pre-hooks, post-hooks, decorators and stickers working together.

use arbor_core::*;
use async_trait::async_trait;
use std::sync::Arc;

struct User {
    id: i64,
}

#[async_trait]
impl Sticker for User {
    async fn create(ctx: &Context) -> Result<Arc<Self>, Error> {
        let uid = ctx
            .request()
            .form_arguments()
            .get("uid")
            .ok_or_else(|| Error::mismatch("uid is required"))?;
        let id = uid
            .parse()
            .map_err(|_| Error::mismatch(format!("invalid uid {uid:?}")))?;
        Ok(Arc::new(User { id }))
    }
}

fn add_prefix() -> impl PostHook {
    post_fn(|_, reply| {
        Box::pin(async move {
            Ok(Reply::text(format!("prefix:[{}]", reply.as_text().unwrap_or_default())))
        })
    })
}

fn add_suffix(suffix: &'static str) -> impl PostHook {
    post_fn(move |_, reply| {
        Box::pin(async move {
            Ok(Reply::text(format!("[{}]:{suffix}", reply.as_text().unwrap_or_default())))
        })
    })
}

fn check_access(allowed: fn(i64) -> bool) -> impl PreHook {
    pre_fn(move |ctx, _| {
        Box::pin(async move {
            let user = ctx.sticker::<User>().await?;
            Ok((!allowed(user.id)).then(|| Reply::from("denied")))
        })
    })
}

/// Answers `form` for requests without arguments, otherwise calls the
/// endpoint with invented input.
fn form() -> impl Decorator<Reply> {
    decorator_fn::<Reply, _>(|ctx, _input, next| {
        Box::pin(async move {
            if ctx.request().form_arguments().is_empty() {
                return Ok(Reply::from("form"));
            }
            next.run(Input::new().arg(1).kwarg("b", 2)).await
        })
    })
}

/// Adds a `c` argument the outer layers never see.
fn hidden() -> impl Decorator<Reply> {
    decorator_fn::<Reply, _>(|_, input, next| {
        Box::pin(async move {
            let (Some(a), Some(b)) = (input.positional(0).cloned(), input.keyword("b").cloned())
            else {
                return Err(Error::mismatch("hidden wrapper takes `a` and `b`"));
            };
            next.run(Input::new().arg(a).kwarg("b", b).kwarg("c", 69)).await
        })
    })
}

fn forum(user: Arc<User>, id: i64) -> Result<Arc<dyn Resource>, Error> {
    let index_user = user.clone();
    ResourceTable::builder()
        .leaf(
            "index",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(move |_, _| {
                    let uid = index_user.id;
                    Box::pin(async move { Ok(Reply::text(format!("forum(user:{uid})"))) })
                }),
            ),
        )
        .leaf(
            "topic",
            Endpoint::page(
                Signature::compile([Parameter::int("id")])?,
                leaf_fn(move |_, args| {
                    let uid = user.id;
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "forum(user:{uid}, forum:{id}, topic:{})",
                            args.int("id")?
                        )))
                    })
                }),
            )
            .pre(check_access(|uid| uid % 7 == 0))
            .pre(check_access(|uid| uid % 3 == 0))
            .post(add_suffix("allowed")),
        )
        .build()
}

fn site() -> Site {
    let root = ResourceTable::builder()
        .leaf(
            "about",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(|_, _| Box::pin(async { Ok(Reply::from("about")) })),
            )
            .post(add_prefix()),
        )
        .leaf(
            "profile",
            Endpoint::page(
                Signature::compile([Parameter::sticker::<User>("user")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        let user = args.sticker::<User>("user")?;
                        Ok(Reply::text(format!("profile({})", user.id)))
                    })
                }),
            ),
        )
        .leaf(
            "friend",
            Endpoint::page(
                Signature::compile([Parameter::sticker::<User>("user"), Parameter::int("friend")])
                    .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        let user = args.sticker::<User>("user")?;
                        Ok(Reply::text(format!(
                            "profile({}).friend({})",
                            user.id,
                            args.int("friend")?
                        )))
                    })
                }),
            ),
        )
        .leaf(
            "info",
            Endpoint::page(
                Signature::compile([Parameter::int("uid")]).unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move { Ok(Reply::text(format!("info({})", args.int("uid")?))) })
                }),
            )
            .post(add_prefix()),
        )
        .leaf(
            "banner",
            Endpoint::page(
                Signature::compile([
                    Parameter::int("ad"),
                    Parameter::sticker::<User>("user"),
                    Parameter::keyword("position")
                        .coerce(ScalarType::Str)
                        .default("norm"),
                ])
                .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        let user = args.sticker::<User>("user")?;
                        Ok(Reply::text(format!(
                            "banner(ad:{}, uid:{}, position:{})",
                            args.int("ad")?,
                            user.id,
                            args.str("position")?
                        )))
                    })
                }),
            )
            .post(add_suffix("suf"))
            .post(add_prefix()),
        )
        .transition(
            "forum",
            Endpoint::transition(
                Signature::compile([
                    Parameter::sticker::<User>("user"),
                    Parameter::int("id").default(-1),
                ])
                .unwrap(),
                transition_fn(|_, args| {
                    Box::pin(async move { forum(args.sticker::<User>("user")?, args.int("id")?) })
                }),
            )
            .pre(check_access(|uid| uid % 2 == 0))
            .post(add_suffix("denied")),
        )
        .leaf(
            "form1",
            Endpoint::page(
                Signature::compile([Parameter::positional("a"), Parameter::positional("b")])
                    .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "form1({}, {})",
                            args.value("a")?,
                            args.value("b")?
                        )))
                    })
                }),
            )
            .decorate(form()),
        )
        .leaf(
            "form2",
            Endpoint::page(
                Signature::compile([
                    Parameter::sticker::<User>("u"),
                    Parameter::positional("a"),
                    Parameter::positional("b"),
                    Parameter::positional("c"),
                ])
                .unwrap(),
                leaf_fn(|_, args| {
                    Box::pin(async move {
                        let user = args.sticker::<User>("u")?;
                        Ok(Reply::text(format!(
                            "form2({}, {}, {}, {})",
                            args.value("a")?,
                            args.value("b")?,
                            args.value("c")?,
                            user.id
                        )))
                    })
                }),
            )
            .decorate(hidden())
            .decorate(form())
            .post(add_prefix()),
        )
        .build()
        .unwrap();
    Site::new([root])
}

async fn resolve(uri: &str) -> String {
    let reply = site().resolve(Request::get(uri)).await.unwrap();
    reply.as_text().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_post_hook() {
    assert_eq!(resolve("/about").await, "prefix:[about]");
    assert_eq!(resolve("/info/3").await, "prefix:[info(3)]");
}

#[tokio::test]
async fn test_sticker_arguments() {
    assert_eq!(resolve("/profile?uid=3").await, "profile(3)");
    assert_eq!(resolve("/friend/2?uid=3").await, "profile(3).friend(2)");
}

#[tokio::test]
async fn test_sticker_on_transition() {
    assert_eq!(resolve("/forum?uid=14").await, "forum(user:14)");
}

#[tokio::test]
async fn test_post_hooks_apply_in_declaration_order() {
    assert_eq!(
        resolve("/banner/3?uid=4").await,
        "prefix:[[banner(ad:3, uid:4, position:norm)]:suf]"
    );
    assert_eq!(
        resolve("/banner/?ad=2&uid=5").await,
        "prefix:[[banner(ad:2, uid:5, position:norm)]:suf]"
    );
    assert_eq!(
        resolve("/banner/3?uid=12&position=abc").await,
        "prefix:[[banner(ad:3, uid:12, position:abc)]:suf]"
    );
}

#[tokio::test]
async fn test_decorator_skips_handler() {
    assert_eq!(resolve("/form1").await, "form");
    assert_eq!(resolve("/form2").await, "prefix:[form]");
}

#[tokio::test]
async fn test_decorator_invents_arguments() {
    assert_eq!(resolve("/form1?a=7").await, "form1(1, 2)");
    assert_eq!(resolve("/form2?uid=13").await, "prefix:[form2(1, 2, 69, 13)]");
}

#[tokio::test]
async fn test_access_checks() {
    assert_eq!(
        resolve("/forum/1/topic/2?uid=42").await,
        "[forum(user:42, forum:1, topic:2)]:allowed"
    );
    assert_eq!(resolve("/forum/1/topic/2?uid=6").await, "[denied]:allowed");
    assert_eq!(resolve("/forum/1/topic/2?uid=21").await, "[denied]:denied");
    assert_eq!(resolve("/forum/1/topic/2?uid=14").await, "[denied]:allowed");
}

#[tokio::test]
async fn test_missing_sticker_input_is_not_found() {
    let err = site().resolve(Request::get("/profile")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));
}
