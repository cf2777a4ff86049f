// Integration tests for patch orchestration
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use modkit_core::{
    DispatchEngine, HookEngine, HookInvocation, MemberHook, MemberSignature, ModHost,
    PatchAssembly, PatchGroupDescriptor, PatchHostRegistry, PatchOrchestrator, Side,
};

struct CountingHook(Arc<AtomicUsize>);

impl MemberHook for CountingHook {
    fn after(&self, _call: &HookInvocation) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct TestAssembly {
    identity: String,
    groups: Vec<fn() -> PatchGroupDescriptor>,
    fail_scan: bool,
}

impl TestAssembly {
    fn new(identity: &str, groups: Vec<fn() -> PatchGroupDescriptor>) -> Arc<dyn PatchAssembly> {
        Arc::new(Self {
            identity: identity.to_string(),
            groups,
            fail_scan: false,
        })
    }

    fn failing(identity: &str) -> Arc<dyn PatchAssembly> {
        Arc::new(Self {
            identity: identity.to_string(),
            groups: Vec::new(),
            fail_scan: true,
        })
    }
}

impl PatchAssembly for TestAssembly {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn patch_groups(&self) -> anyhow::Result<Vec<PatchGroupDescriptor>> {
        if self.fail_scan {
            anyhow::bail!("reflection over {} blew up", self.identity);
        }
        Ok(self.groups.iter().map(|build| build()).collect())
    }
}

fn stack() -> (Arc<DispatchEngine>, Arc<PatchHostRegistry>, PatchOrchestrator) {
    let engine = Arc::new(DispatchEngine::new());
    let registry = Arc::new(PatchHostRegistry::new(
        Arc::clone(&engine) as Arc<dyn HookEngine>
    ));
    let orchestrator = PatchOrchestrator::new(Arc::clone(&registry));
    (engine, registry, orchestrator)
}

fn server_only_group() -> PatchGroupDescriptor {
    PatchGroupDescriptor::new("ServerPatches", Side::Server).target(
        MemberSignature::method("World", "tick"),
        Arc::new(CountingHook(Arc::new(AtomicUsize::new(0)))),
    )
}

#[test]
fn side_gate_blocks_other_side() {
    let (_engine, registry, orchestrator) = stack();
    let assembly = TestAssembly::new("side-gated", vec![server_only_group]);

    orchestrator.apply_all(&[assembly], Side::Client, &|_| true);

    assert!(registry.installed_methods("side-gated").is_empty());
}

#[test]
fn mod_gate_skips_without_error() {
    fn gated() -> PatchGroupDescriptor {
        PatchGroupDescriptor::new("FooIntegration", Side::Universal)
            .require_mod("foo")
            .target(
                MemberSignature::method("FooApi", "register"),
                Arc::new(CountingHook(Arc::new(AtomicUsize::new(0)))),
            )
    }
    let (_engine, registry, orchestrator) = stack();
    let assembly = TestAssembly::new("foo-compat", vec![gated]);

    orchestrator.apply_all(&[assembly], Side::Server, &|_| false);

    assert!(registry.installed_methods("foo-compat").is_empty());
}

#[test]
fn failing_assembly_does_not_block_the_next_one() {
    fn universal() -> PatchGroupDescriptor {
        PatchGroupDescriptor::new("CorePatches", Side::Universal).target(
            MemberSignature::method("World", "tick"),
            Arc::new(CountingHook(Arc::new(AtomicUsize::new(0)))),
        )
    }
    let (_engine, registry, orchestrator) = stack();
    let broken = TestAssembly::failing("broken");
    let healthy = TestAssembly::new("healthy", vec![universal]);

    orchestrator.apply_all(&[broken, healthy], Side::Server, &|_| true);

    assert!(registry.installed_methods("broken").is_empty());
    assert_eq!(registry.installed_methods("healthy").len(), 1);
}

#[test]
fn applied_hooks_fire_through_the_engine() {
    static FIRED: AtomicUsize = AtomicUsize::new(0);

    struct Bump;
    impl MemberHook for Bump {
        fn after(&self, _call: &HookInvocation) {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn group() -> PatchGroupDescriptor {
        PatchGroupDescriptor::new("TickPatches", Side::Universal)
            .target(MemberSignature::method("World", "tick"), Arc::new(Bump))
    }

    let (engine, _registry, orchestrator) = stack();
    let assembly = TestAssembly::new("ticker", vec![group]);
    orchestrator.apply_all(&[assembly], Side::Server, &|_| true);

    let ran = engine.run_with_hooks(&MemberSignature::method("World", "tick"), || ());
    assert!(ran.is_some());
    assert_eq!(FIRED.load(Ordering::SeqCst), 1);
}

#[test]
fn reverse_all_removes_hooks_and_runs_cleanup() {
    static CLEANED: AtomicBool = AtomicBool::new(false);

    fn group() -> PatchGroupDescriptor {
        PatchGroupDescriptor::new("Cleanable", Side::Universal)
            .target(
                MemberSignature::method("World", "tick"),
                Arc::new(CountingHook(Arc::new(AtomicUsize::new(0)))),
            )
            .on_cleanup(|| CLEANED.store(true, Ordering::SeqCst))
    }

    let (_engine, registry, orchestrator) = stack();
    let assembly = TestAssembly::new("cleanable", vec![group]);
    orchestrator.apply_all(&[assembly], Side::Server, &|_| true);
    assert_eq!(registry.installed_methods("cleanable").len(), 1);

    orchestrator.reverse_all(Side::Server);

    assert!(registry.installed_methods("cleanable").is_empty());
    assert!(CLEANED.load(Ordering::SeqCst));

    // reversing twice is a no-op
    CLEANED.store(false, Ordering::SeqCst);
    orchestrator.reverse_all(Side::Server);
    assert!(!CLEANED.load(Ordering::SeqCst));
}

#[test]
fn cleanup_respects_the_side_gate_at_teardown() {
    static CLEANED: AtomicBool = AtomicBool::new(false);

    fn group() -> PatchGroupDescriptor {
        PatchGroupDescriptor::new("ServerOnly", Side::Server)
            .on_cleanup(|| CLEANED.store(true, Ordering::SeqCst))
    }

    let (_engine, _registry, orchestrator) = stack();
    let assembly = TestAssembly::new("server-only", vec![group]);
    orchestrator.apply_all(&[assembly], Side::Server, &|_| true);

    orchestrator.reverse_all(Side::Client);
    assert!(!CLEANED.load(Ordering::SeqCst));
}

#[test]
fn host_supplies_side_and_mod_lookups() {
    struct FakeHost;
    impl ModHost for FakeHost {
        fn current_side(&self) -> Side {
            Side::Client
        }
        fn is_mod_active(&self, mod_id: &str) -> bool {
            mod_id == "present"
        }
        fn current_world_id(&self) -> Option<String> {
            None
        }
    }

    fn client_group() -> PatchGroupDescriptor {
        PatchGroupDescriptor::new("HudPatches", Side::Client)
            .require_mod("present")
            .target(
                MemberSignature::method("Hud", "compose"),
                Arc::new(CountingHook(Arc::new(AtomicUsize::new(0)))),
            )
    }

    let (_engine, registry, orchestrator) = stack();
    let assembly = TestAssembly::new("hud", vec![client_group]);
    orchestrator.apply_all_from_host(&[assembly], &FakeHost);

    assert_eq!(registry.installed_methods("hud").len(), 1);
}
