use autowire_di::context::{ApplicationContext, Provider};
use autowire_di::injection::InjectionDeclaration;
use autowire_di::instance::{ErrorPtr, Instance, InstancePtr};
use autowire_di::provider::{Arguments, Injectable, ProviderDescriptor};
use autowire_di::resolver::ResolverOptions;
use autowire_di::token::{Symbol, Token};
use autowire_di::{ApplicationContextError, ResolverError};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

type Document = BTreeMap<&'static str, i64>;

trait Encoder: Send + Sync {
    fn encode(&self, document: &Document) -> String;
}

struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, document: &Document) -> String {
        format!(
            "{{{}}}",
            document
                .iter()
                .map(|(key, value)| format!("\"{key}\":{value}"))
                .join(",")
        )
    }
}

impl Injectable for JsonEncoder {
    fn construct(_arguments: Arguments) -> Result<Self, ErrorPtr> {
        Ok(JsonEncoder)
    }
}

struct HexEncoder;

impl Encoder for HexEncoder {
    fn encode(&self, document: &Document) -> String {
        format!(
            "0x{}",
            document
                .values()
                .map(|value| format!("{value:02x}"))
                .join("")
        )
    }
}

impl Injectable for HexEncoder {
    fn construct(_arguments: Arguments) -> Result<Self, ErrorPtr> {
        Ok(HexEncoder)
    }
}

struct Service {
    encoder: Option<InstancePtr<dyn Encoder>>,
}

impl Injectable for Service {
    fn parameters() -> Vec<Token> {
        vec!["hex".into()]
    }

    fn construct(arguments: Arguments) -> Result<Self, ErrorPtr> {
        Ok(Service {
            encoder: arguments.cast::<dyn Encoder>(0),
        })
    }
}

#[derive(Default)]
struct Reporter {
    encoder: Option<InstancePtr<dyn Encoder>>,
}

impl Injectable for Reporter {
    fn construct(_arguments: Arguments) -> Result<Self, ErrorPtr> {
        Ok(Reporter::default())
    }

    fn inject_property(&mut self, key: &str, value: &Instance) -> bool {
        match key {
            "encoder" => {
                self.encoder = value.cast::<dyn Encoder>();
                self.encoder.is_some()
            }
            _ => false,
        }
    }
}

fn encoders() -> Vec<Provider> {
    vec![
        ProviderDescriptor::for_type::<HexEncoder>()
            .with_token("hex")
            .with_alias::<HexEncoder, dyn Encoder>(|encoder| encoder)
            .into(),
        ProviderDescriptor::for_type::<JsonEncoder>()
            .with_token("JSON_ENCODER")
            .with_alias::<JsonEncoder, dyn Encoder>(|encoder| encoder)
            .into(),
    ]
}

fn document() -> Document {
    BTreeMap::from([("a", 1)])
}

#[test]
fn should_inject_declared_encoder() {
    let mut context = ApplicationContext::builder()
        .with_providers(encoders())
        .with_provider(Provider::of::<Service>())
        .with_declaration(InjectionDeclaration::parameter(
            Token::of::<Service>(),
            0,
            "JSON_ENCODER",
        ))
        .build()
        .unwrap();

    let service = context.get_typed::<Service>().unwrap().unwrap();
    let encoded = service.encoder.as_ref().unwrap().encode(&document());

    let hex = context
        .get_as::<dyn Encoder, _>("hex")
        .unwrap()
        .unwrap()
        .encode(&document());

    assert_eq!(encoded, r#"{"a":1}"#);
    assert_ne!(encoded, hex);
}

#[test]
fn should_inject_natural_encoder_without_declaration() {
    let mut context = ApplicationContext::builder()
        .with_providers(encoders())
        .with_provider(Provider::of::<Service>())
        .build()
        .unwrap();

    let service = context.get_typed::<Service>().unwrap().unwrap();
    assert_eq!(service.encoder.as_ref().unwrap().encode(&document()), "0x01");
}

#[test]
fn should_reject_empty_provider_list() {
    assert_eq!(
        ApplicationContext::builder().build().err(),
        Some(ApplicationContextError::NoProviders)
    );
}

#[test]
fn should_expose_only_valid_providers() {
    let mut context = ApplicationContext::builder()
        .with_provider(ProviderDescriptor::new())
        .with_provider(ProviderDescriptor::new().with_token("valid").with_value(1u8))
        .build()
        .unwrap();

    assert_eq!(context.registry().modules().len(), 1);
    assert!(context.get("valid").unwrap().is_some());
}

#[test]
fn should_return_same_instance_by_default() {
    let mut context = ApplicationContext::builder()
        .with_providers(encoders())
        .build()
        .unwrap();

    let first = context.get("hex").unwrap().unwrap();
    let second = context.get("hex").unwrap().unwrap();
    assert!(first.ptr_eq(&second));
}

#[test]
fn should_construct_new_instances_without_singletons() {
    let mut context = ApplicationContext::builder()
        .with_providers(encoders())
        .with_resolver_options(ResolverOptions {
            singleton: false,
            ..Default::default()
        })
        .build()
        .unwrap();

    let first = context.get("hex").unwrap().unwrap();
    let second = context.get("hex").unwrap().unwrap();
    assert!(!first.ptr_eq(&second));
}

#[test]
fn should_prefer_value_over_factory() {
    static FACTORY_CALLS: AtomicUsize = AtomicUsize::new(0);

    let mut context = ApplicationContext::builder()
        .with_provider(
            ProviderDescriptor::new()
                .with_token("answer")
                .with_value(42u32)
                .with_factory(|| {
                    FACTORY_CALLS.fetch_add(1, Ordering::SeqCst);
                    Ok(0u32)
                }),
        )
        .build()
        .unwrap();

    assert_eq!(*context.get_as::<u32, _>("answer").unwrap().unwrap(), 42);
    assert_eq!(FACTORY_CALLS.load(Ordering::SeqCst), 0);
}

#[test]
fn should_inject_property_with_cached_instance() {
    let mut context = ApplicationContext::builder()
        .with_providers(encoders())
        .with_provider(Provider::of::<Reporter>())
        .with_declaration(InjectionDeclaration::property(
            Token::of::<Reporter>(),
            "encoder",
            "JSON_ENCODER",
        ))
        .build()
        .unwrap();

    let reporter = context.get_typed::<Reporter>().unwrap().unwrap();
    let encoder = context
        .get_as::<dyn Encoder, _>("JSON_ENCODER")
        .unwrap()
        .unwrap();

    assert!(std::ptr::eq(
        InstancePtr::as_ptr(reporter.encoder.as_ref().unwrap()) as *const (),
        InstancePtr::as_ptr(&encoder) as *const ()
    ));
}

#[test]
fn should_list_group_in_registration_order() {
    let mut context = ApplicationContext::builder()
        .with_grouped_provider(
            "encoders",
            ProviderDescriptor::for_type::<JsonEncoder>()
                .with_alias::<JsonEncoder, dyn Encoder>(|encoder| encoder),
        )
        .with_grouped_provider(
            "encoders",
            ProviderDescriptor::for_type::<HexEncoder>()
                .with_alias::<HexEncoder, dyn Encoder>(|encoder| encoder),
        )
        .with_grouped_provider("other", Provider::of::<Service>())
        .build()
        .unwrap();

    let encoded = context
        .get_for("encoders")
        .unwrap()
        .iter()
        .filter_map(Instance::cast::<dyn Encoder>)
        .map(|encoder| encoder.encode(&document()))
        .collect_vec();

    assert_eq!(encoded, vec![r#"{"a":1}"#.to_string(), "0x01".to_string()]);
}

#[test]
fn should_resolve_symbol_tokens() {
    let primary = Symbol::new("encoder");
    let secondary = Symbol::new("encoder");

    let mut context = ApplicationContext::builder()
        .with_provider(
            ProviderDescriptor::for_type::<JsonEncoder>()
                .with_token(primary)
                .with_alias::<JsonEncoder, dyn Encoder>(|encoder| encoder),
        )
        .build()
        .unwrap();

    assert!(context.get(primary).unwrap().is_some());
    assert!(context.get(secondary).unwrap().is_none());
}

#[test]
fn should_reject_incomplete_instances_in_strict_mode() {
    let mut context = ApplicationContext::builder()
        .with_provider(Provider::of::<Service>())
        .with_resolver_options(ResolverOptions {
            reject_incomplete: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    match context.get_typed::<Service>() {
        Err(ResolverError::UnresolvedDependency { token, index }) => {
            assert_eq!(token, Token::from("hex"));
            assert_eq!(index, 0);
        }
        other => panic!("Unexpected resolution result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn should_read_metadata_without_construction() {
    static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

    let mut context = ApplicationContext::builder()
        .with_provider(
            ProviderDescriptor::new()
                .with_token("counted")
                .with_factory(|| {
                    CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
                    Ok(1u8)
                })
                .with_metadata("route:/counted"),
        )
        .build()
        .unwrap();

    let metadata = context.get_metadata("counted").unwrap();
    assert_eq!(
        metadata.downcast_ref::<&str>().copied(),
        Some("route:/counted")
    );
    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 0);

    context.get("counted").unwrap();
    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
}
