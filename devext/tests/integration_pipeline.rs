use devext::{
    BoxError, Dispatcher, PipelinePolicy, TypeRegistry, TypeRegistryBuilder,
    testing::CollectingSink,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Text(String);

fn append(suffix: &'static str) -> impl Fn(&mut Text, &()) -> Text + Send + Sync + 'static {
    move |text: &mut Text, _: &()| Text(format!("{}{suffix}", text.0))
}

fn builder() -> TypeRegistryBuilder {
    TypeRegistry::builder()
}

#[test]
fn test_pipeline_folds_in_resolution_order() {
    let mut types = builder();
    types
        .declare::<Text>(|ty| {
            ty.transform("f1", "Format", append("1"))
                .transform("f2", "Format", append("2"))
                .transform("f3", "Format", append("3"));
        })
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(types.build().unwrap()));

    let out = dispatcher
        .invoke_pipeline(Text("x".into()), "Format", &())
        .unwrap();
    assert_eq!(out, Text("x123".into()));
}

#[test]
fn test_pipeline_passes_arguments_to_every_step() {
    let mut types = builder();
    types
        .declare::<Text>(|ty| {
            ty.transform("repeat", "Format", |text: &mut Text, times: &usize| {
                Text(text.0.repeat(*times))
            })
            .transform("count", "Format", |text: &mut Text, times: &usize| {
                Text(format!("{}:{times}", text.0))
            });
        })
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(types.build().unwrap()));

    let out = dispatcher
        .invoke_pipeline(Text("ab".into()), "Format", &3usize)
        .unwrap();
    assert_eq!(out.0, "ababab:3");
}

#[test]
fn test_pipeline_skips_failed_step_and_continues() {
    let mut types = builder();
    types
        .declare::<Text>(|ty| {
            ty.transform("f1", "Format", append("1"))
                .try_transform("check", "Format", |_: &mut Text, _: &()| -> Result<Text, BoxError> {
                    Err("rejected".into())
                })
                .transform("f3", "Format", append("3"));
        })
        .unwrap();

    let sink = CollectingSink::new();
    let dispatcher = Dispatcher::builder(Arc::new(types.build().unwrap()))
        .sink(sink.clone())
        .build();

    let out = dispatcher
        .invoke_pipeline(Text("x".into()), "Format", &())
        .unwrap();
    assert_eq!(out.0, "x13");
    assert_eq!(sink.count(), 1);
    assert_eq!(sink.failures()[0].candidate.method(), "check");
    assert_eq!(sink.failures()[0].message, "rejected");
}

#[test]
fn test_pipeline_abort_policy_stops_folding() {
    let mut types = builder();
    types
        .declare::<Text>(|ty| {
            ty.transform("f1", "Format", append("1"))
                .method("observe", "Format", |_: &mut Text, _: &()| {})
                .transform("f3", "Format", append("3"));
        })
        .unwrap();

    let sink = CollectingSink::new();
    let dispatcher = Dispatcher::builder(Arc::new(types.build().unwrap()))
        .pipeline_policy(PipelinePolicy::Abort)
        .sink(sink.clone())
        .build();

    let out = dispatcher
        .invoke_pipeline(Text("x".into()), "Format", &())
        .unwrap();
    assert_eq!(out.0, "x1");
    assert!(sink.failures()[0].message.starts_with("pipeline step returned `()`"));
}

#[test]
fn test_pipeline_without_candidates_returns_input() {
    let dispatcher = Dispatcher::new(Arc::new(builder().build().unwrap()));

    let out = dispatcher
        .invoke_pipeline(Text("same".into()), "Format", &())
        .unwrap();
    assert_eq!(out, Text("same".into()));
}

#[test]
fn test_pipeline_override_without_retagging() {
    #[derive(Debug, PartialEq)]
    struct Heading {
        text: Text,
    }

    let mut types = builder();
    types
        .declare::<Text>(|ty| {
            ty.transform("decorate", "Format", append("*"));
        })
        .unwrap();
    types
        .declare::<Heading>(|ty| {
            ty.inherits(|h: &mut Heading| &mut h.text)
                .override_transform("decorate", |h: &mut Heading, _: &()| Heading {
                    text: Text(format!("# {}", h.text.0)),
                });
        })
        .unwrap();

    let sink = CollectingSink::new();
    let dispatcher = Dispatcher::builder(Arc::new(types.build().unwrap()))
        .sink(sink.clone())
        .build();

    let out = dispatcher
        .invoke_pipeline(Heading { text: Text("intro".into()) }, "Format", &())
        .unwrap();
    assert_eq!(out.text, Text("# intro".into()));
    assert!(sink.is_empty());
}
