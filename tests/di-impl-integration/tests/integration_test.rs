//! Centralized integration tests for the component container
use di_abstractions::{ComponentContainer, ComponentDescriptor, ResolveContext};
use di_impl::{ComponentStorage, InstanceDescriptor, ValueDescriptor};
use infrastructure_common::{
    Capability, ComponentError, ComponentStorageState, ContainerConfig, ContainerError,
    ContainerResult, CyclePolicy,
};
use infrastructure_composition::ContainerBuilder;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::io::Write;
use std::sync::{Arc, Once};

static INIT_LOGGING: Once = Once::new();

fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

type Journal = Arc<Mutex<Vec<String>>>;

fn expect_err<T>(result: Result<T, ContainerError>) -> ContainerError {
    match result {
        Ok(_) => panic!("expected the container to fail"),
        Err(error) => error,
    }
}

fn erase<D: ComponentDescriptor + 'static>(descriptor: Arc<D>) -> Arc<dyn ComponentDescriptor> {
    descriptor
}

/// 日志服务
trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

struct JournalLogger {
    journal: Journal,
}

impl Logger for JournalLogger {
    fn log(&self, message: &str) {
        self.journal.lock().push(format!("log: {}", message));
    }
}

/// 缓存，构造时依赖 Logger
struct Cache {
    logger: Arc<dyn Logger>,
}

/// 业务服务，通过属性注入依赖 Cache 和 Logger
struct Service {
    cache: OnceCell<Arc<Cache>>,
    logger: OnceCell<Arc<dyn Logger>>,
}

fn layered_application(journal: &Journal) -> Vec<Arc<dyn ComponentDescriptor>> {
    let logger_journal = journal.clone();
    let teardown_journal = journal.clone();
    let logger = InstanceDescriptor::builder(move |_| {
        Ok(JournalLogger {
            journal: logger_journal.clone(),
        })
    })
    .named("Logger")
    .provides::<dyn Logger, _>(|logger| logger)
    .with_teardown(move |_| {
        teardown_journal.lock().push("dispose Logger".to_string());
        Ok(())
    })
    .build();

    let teardown_journal = journal.clone();
    let cache = InstanceDescriptor::builder(|context| {
        let logger = context.require::<dyn Logger>()?;
        logger.log("cache created");
        Ok(Cache { logger })
    })
    .with_teardown(move |cache| {
        cache.logger.log("cache closing");
        teardown_journal.lock().push("dispose Cache".to_string());
        Ok(())
    })
    .build();

    let teardown_journal = journal.clone();
    let service = InstanceDescriptor::builder(|_| {
        Ok(Service {
            cache: OnceCell::new(),
            logger: OnceCell::new(),
        })
    })
    .with_injector(|service, context| {
        let _ = service.cache.set(context.require::<Cache>()?);
        let _ = service.logger.set(context.require::<dyn Logger>()?);
        Ok(())
    })
    .with_teardown(move |service| {
        if let Some(logger) = service.logger.get() {
            logger.log("service closing");
        }
        teardown_journal.lock().push("dispose Service".to_string());
        Ok(())
    })
    .build();

    vec![erase(logger), erase(cache), erase(service)]
}

fn disposals(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .iter()
        .filter(|entry| entry.starts_with("dispose"))
        .cloned()
        .collect()
}

#[test]
fn test_layered_application_tears_down_dependents_first() -> anyhow::Result<()> {
    init_test_logging();
    let journal: Journal = Arc::default();
    let storage = ComponentStorage::new("layered");
    let context = ResolveContext::new(&storage);

    storage.register_descriptors(&context, layered_application(&journal))?;
    storage.compose(&context)?;

    let service = context.require::<Service>()?;
    assert!(service.cache.get().is_some());
    assert!(service.logger.get().is_some());

    storage.dispose()?;

    assert_eq!(
        disposals(&journal),
        vec!["dispose Service", "dispose Cache", "dispose Logger"]
    );
    // dependencies are still alive while their dependents close
    let entries = journal.lock().clone();
    let service_closing = entries.iter().position(|e| e == "log: service closing").unwrap();
    let logger_disposed = entries.iter().position(|e| e == "dispose Logger").unwrap();
    assert!(service_closing < logger_disposed);
    assert_eq!(storage.state(), ComponentStorageState::Disposed);
    Ok(())
}

#[test]
fn test_registration_order_does_not_affect_teardown_order() -> anyhow::Result<()> {
    init_test_logging();
    let journal: Journal = Arc::default();
    let mut descriptors = layered_application(&journal);
    descriptors.reverse();

    let container = ContainerBuilder::new()
        .with_id("reversed")
        .register_descriptor(descriptors[0].clone())
        .register_descriptor(descriptors[1].clone())
        .register_descriptor(descriptors[2].clone())
        .build()?;
    container.dispose()?;

    assert_eq!(
        disposals(&journal),
        vec!["dispose Service", "dispose Cache", "dispose Logger"]
    );
    Ok(())
}

trait Formatter: Send + Sync {
    fn format(&self, input: &str) -> String;
}

struct Upper;

impl Formatter for Upper {
    fn format(&self, input: &str) -> String {
        input.to_uppercase()
    }
}

struct Quoted;

impl Formatter for Quoted {
    fn format(&self, input: &str) -> String {
        format!("\"{}\"", input)
    }
}

#[test]
fn test_two_formatters_are_ambiguous_but_enumerable() -> anyhow::Result<()> {
    init_test_logging();
    let container = ContainerBuilder::new()
        .register(Arc::new(
            ValueDescriptor::new(Upper).provides::<dyn Formatter, _>(|f| f),
        ))
        .register(
            InstanceDescriptor::builder(|_| Ok(Quoted))
                .provides::<dyn Formatter, _>(|f| f)
                .build(),
        )
        .build()?;

    let error = expect_err(container.get::<dyn Formatter>());
    assert!(error.is_ambiguous());
    assert!(!error.is_consistency_error());

    let error = container
        .resolve_descriptor(&Capability::of::<dyn Formatter>())
        .unwrap_err();
    match error {
        ContainerError::AmbiguousBinding {
            candidates, state, ..
        } => {
            assert_eq!(candidates, vec!["Upper".to_string(), "Quoted".to_string()]);
            assert_eq!(state, ComponentStorageState::Initialized);
        }
        other => panic!("unexpected error: {other}"),
    }

    let formatted: Vec<String> = container
        .get_all::<dyn Formatter>()?
        .iter()
        .map(|f| f.format("x"))
        .collect();
    assert_eq!(formatted, vec!["X".to_string(), "\"x\"".to_string()]);

    assert_eq!(container.require::<Upper>()?.format("a"), "A");
    Ok(())
}

#[test]
fn test_absent_capability_is_not_an_error() -> anyhow::Result<()> {
    init_test_logging();
    let container = ContainerBuilder::new().build()?;

    assert!(container.get::<dyn Formatter>()?.is_none());
    assert!(container.get_all::<dyn Formatter>()?.is_empty());
    assert!(matches!(
        container.require::<dyn Formatter>(),
        Err(ContainerError::Unresolved { .. })
    ));
    Ok(())
}

#[test]
fn test_resolve_multiple_returns_every_binding_in_order() -> anyhow::Result<()> {
    init_test_logging();
    for n in 0..6 {
        let storage = ComponentStorage::new(format!("multiple-{}", n));
        let context = ResolveContext::new(&storage);
        let descriptors: Vec<Arc<dyn ComponentDescriptor>> = (0..n)
            .map(|i| {
                erase(Arc::new(
                    ValueDescriptor::new(Upper)
                        .named(format!("formatter-{}", i))
                        .provides::<dyn Formatter, _>(|f| f),
                ))
            })
            .collect();
        storage.register_descriptors(&context, descriptors)?;
        storage.compose(&context)?;

        let names: Vec<String> = context
            .resolve_multiple(&Capability::of::<dyn Formatter>())?
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let expected: Vec<String> = (0..n).map(|i| format!("formatter-{}", i)).collect();
        assert_eq!(names, expected);

        let single = context.resolve(&Capability::of::<dyn Formatter>());
        match n {
            0 => assert!(single?.is_none()),
            1 => assert_eq!(single?.map(|d| d.name().to_string()), Some(expected[0].clone())),
            _ => assert!(expect_err(single).is_ambiguous()),
        }
    }
    Ok(())
}

#[test]
fn test_resolve_before_compose_always_fails() {
    init_test_logging();
    let storage = ComponentStorage::new("not-composed");
    let context = ResolveContext::new(&storage);

    let error = expect_err(context.get::<dyn Formatter>());
    assert!(error.is_consistency_error());

    storage
        .register_descriptors(
            &context,
            vec![erase(Arc::new(ValueDescriptor::new(Upper)))],
        )
        .unwrap();
    let error = expect_err(context.get::<Upper>());
    assert!(error.is_consistency_error());
    let message = error.to_string();
    assert!(message.contains("Upper"), "{message}");
    assert!(message.contains("Initial"), "{message}");
}

#[test]
fn test_empty_container_full_lifecycle() -> anyhow::Result<()> {
    init_test_logging();
    let storage = ComponentStorage::new("empty");
    let context = ResolveContext::new(&storage);

    storage.register_descriptors(&context, Vec::new())?;
    storage.compose(&context)?;
    storage.dispose()?;

    assert_eq!(storage.state(), ComponentStorageState::Disposed);
    Ok(())
}

#[test]
fn test_dispose_before_compose_invokes_no_teardown() -> anyhow::Result<()> {
    init_test_logging();
    let journal: Journal = Arc::default();
    let storage = ComponentStorage::new("never-composed");
    let context = ResolveContext::new(&storage);
    storage.register_descriptors(&context, layered_application(&journal))?;

    storage.dispose()?;

    assert!(journal.lock().is_empty());
    assert_eq!(storage.state(), ComponentStorageState::Initial);
    Ok(())
}

#[test]
fn test_second_dispose_fails_and_container_stays_disposed() -> anyhow::Result<()> {
    init_test_logging();
    let journal: Journal = Arc::default();
    let container = ContainerBuilder::new()
        .register_descriptor(layered_application(&journal)[0].clone())
        .build()?;

    container.dispose()?;
    let error = container.dispose().unwrap_err();

    assert!(error.is_consistency_error());
    assert_eq!(container.state(), ComponentStorageState::Disposed);
    assert_eq!(disposals(&journal), vec!["dispose Logger"]);
    assert!(expect_err(container.get::<dyn Logger>()).is_consistency_error());
    Ok(())
}

#[test]
fn test_live_registration_composes_new_descriptors() -> anyhow::Result<()> {
    init_test_logging();
    let journal: Journal = Arc::default();
    let descriptors = layered_application(&journal);
    let container = ContainerBuilder::new()
        .register_descriptor(descriptors[0].clone())
        .build()?;

    container.register(vec![descriptors[1].clone(), descriptors[2].clone()])?;

    let service = container.require::<Service>()?;
    assert!(service.cache.get().is_some());
    assert_eq!(container.stats().registered_descriptors, 3);

    container.dispose()?;
    assert_eq!(
        disposals(&journal),
        vec!["dispose Service", "dispose Cache", "dispose Logger"]
    );
    Ok(())
}

#[test]
fn test_descriptor_failure_is_wrapped_with_descriptor_name() {
    init_test_logging();
    let broken = InstanceDescriptor::<Cache>::builder(|context| {
        let logger = context.require::<dyn Logger>()?;
        Ok(Cache { logger })
    })
    .named("broken-cache")
    .build();

    let error = expect_err(ContainerBuilder::new().register(broken).build());
    match error {
        ContainerError::Component { descriptor, source } => {
            assert_eq!(descriptor, "broken-cache");
            assert!(matches!(source, ComponentError::Resolution { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// 依赖图节点，每个节点都是一个独立的能力
struct Node<const I: usize>;

fn node<const I: usize>(
    dependencies: Vec<Capability>,
    journal: &Journal,
) -> Arc<dyn ComponentDescriptor> {
    let journal = journal.clone();
    erase(
        InstanceDescriptor::builder(|_| Ok(Node::<I>))
            .named(format!("node-{}", I))
            .with_injector(move |_, context| {
                for capability in &dependencies {
                    context.resolve(capability)?;
                }
                Ok(())
            })
            .with_teardown(move |_| {
                journal.lock().push(format!("node-{}", I));
                Ok(())
            })
            .build(),
    )
}

fn node_capabilities() -> [Capability; 8] {
    [
        Capability::of::<Node<0>>(),
        Capability::of::<Node<1>>(),
        Capability::of::<Node<2>>(),
        Capability::of::<Node<3>>(),
        Capability::of::<Node<4>>(),
        Capability::of::<Node<5>>(),
        Capability::of::<Node<6>>(),
        Capability::of::<Node<7>>(),
    ]
}

/// 无环依赖表：节点 i 只依赖序号更小的节点
fn acyclic_dependencies() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (0..8usize)
        .map(|i| prop::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i))
        .collect::<Vec<_>>()
}

/// 按给定注册顺序组合并释放依赖图，返回释放顺序
fn teardown_order(table: &[Vec<usize>], registration: &[usize]) -> ContainerResult<Vec<String>> {
    let capabilities = node_capabilities();
    let journal: Journal = Arc::default();
    let deps = |i: usize| table[i].iter().map(|&d| capabilities[d]).collect::<Vec<_>>();
    let nodes = [
        node::<0>(deps(0), &journal),
        node::<1>(deps(1), &journal),
        node::<2>(deps(2), &journal),
        node::<3>(deps(3), &journal),
        node::<4>(deps(4), &journal),
        node::<5>(deps(5), &journal),
        node::<6>(deps(6), &journal),
        node::<7>(deps(7), &journal),
    ];
    let descriptors = registration.iter().map(|&i| nodes[i].clone()).collect();

    let storage = ComponentStorage::new("dag");
    let context = ResolveContext::new(&storage);
    storage.register_descriptors(&context, descriptors)?;
    storage.compose(&context)?;
    storage.dispose()?;

    let order = journal.lock().clone();
    Ok(order)
}

proptest! {
    #[test]
    fn test_dependencies_always_outlive_their_dependents(
        table in acyclic_dependencies(),
        registration in Just((0..8).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        init_test_logging();
        let order = teardown_order(&table, &registration)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(order.len(), 8);
        let position = |i: usize| order.iter().position(|name| *name == format!("node-{}", i));
        for (dependent, dependencies) in table.iter().enumerate() {
            for &dependency in dependencies {
                prop_assert!(
                    position(dependent) < position(dependency),
                    "node-{} must be torn down before node-{}",
                    dependent,
                    dependency
                );
            }
        }
    }
}

#[test]
fn test_rejected_cycle_reports_chain() {
    init_test_logging();
    let capabilities = node_capabilities();
    let journal: Journal = Arc::default();

    let result = ContainerBuilder::new()
        .with_config(ContainerConfig::default().with_cycle_policy(CyclePolicy::Reject))
        .register_descriptor(node::<0>(vec![capabilities[1]], &journal))
        .register_descriptor(node::<1>(vec![capabilities[2]], &journal))
        .register_descriptor(node::<2>(vec![capabilities[0]], &journal))
        .build();

    let message = expect_err(result).to_string();
    assert!(message.contains("node-2 -> node-0 -> node-1 -> node-2"), "{message}");
}

#[test]
fn test_tolerated_cycle_still_disposes_everything() -> anyhow::Result<()> {
    init_test_logging();
    let capabilities = node_capabilities();
    let journal: Journal = Arc::default();

    let container = ContainerBuilder::new()
        .register_descriptor(node::<0>(vec![capabilities[1]], &journal))
        .register_descriptor(node::<1>(vec![capabilities[2]], &journal))
        .register_descriptor(node::<2>(vec![capabilities[0]], &journal))
        .build()?;
    container.dispose()?;

    assert_eq!(*journal.lock(), vec!["node-0", "node-1", "node-2"]);
    Ok(())
}

#[test]
fn test_config_file_drives_policies() -> anyhow::Result<()> {
    init_test_logging();
    let capabilities = node_capabilities();
    let journal: Journal = Arc::default();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(file, "cycle_policy = \"reject\"")?;
    writeln!(file, "trace_resolution = true")?;

    let result = ContainerBuilder::new()
        .add_config_toml(file.path())?
        .register_descriptor(node::<0>(vec![capabilities[1]], &journal))
        .register_descriptor(node::<1>(vec![capabilities[0]], &journal))
        .build();

    assert!(result.is_err());
    Ok(())
}
