//! Mapping-layer scenarios: the decline protocol, site recognition, mux
//! allocation, the preserved `Select` operand routing, and a mapped branch
//! driven end to end through its verbs.

use std::cell::RefCell;
use std::rc::Rc;

use crate::fu::{Bcu, BcuConfig, BcuTransactionSite, Mux2TransactionSite};
use crate::logic::LogicVector;
use crate::signal::VecSignal;
use crate::test_utils::BcuBench;
use crate::transact::DriveSource;
use crate::xil::{
    BcuMapper, BranchLabel, DefaultInstructionSet, Mux2Mapper, Project, ResourceKind,
    TypeDescriptor, XilMapper, XilOpcode,
};

fn test_bcu(latency: usize) -> Rc<RefCell<Bcu>> {
    Rc::new(RefCell::new(
        Bcu::new(
            "bcu0",
            BcuConfig {
                addr_width: 4,
                startup_addr: LogicVector::zeros(4),
                latency,
            },
        )
        .expect("valid latency"),
    ))
}

#[test]
fn bcu_mapper_supports_the_control_flow_opcodes() {
    let mapper = BcuMapper::new(test_bcu(1));
    let opcodes: Vec<XilOpcode> = mapper
        .supported_instructions()
        .iter()
        .map(|i| i.opcode)
        .collect();
    assert_eq!(
        opcodes,
        [
            XilOpcode::Goto,
            XilOpcode::BranchIfTrue,
            XilOpcode::BranchIfFalse
        ]
    );
}

#[test]
fn bcu_mapper_maps_only_its_own_host() {
    let iset = DefaultInstructionSet;
    let goto = iset.goto(BranchLabel::new(5));

    let mapper = BcuMapper::new(test_bcu(2));
    let own = mapper
        .try_map(mapper.site().as_ref(), &goto, &[], &[])
        .expect("mapper call");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].resource_kind(), ResourceKind::Exclusive);
    assert_eq!(own[0].initiation_interval(), 1);
    assert_eq!(own[0].latency(), 2);

    // A site on a different BCU is declined.
    let foreign = BcuTransactionSite::new(test_bcu(1));
    assert!(
        mapper
            .try_map(&foreign, &goto, &[], &[])
            .expect("mapper call")
            .is_empty()
    );

    // A non-control-flow instruction is declined.
    assert!(
        mapper
            .try_map(mapper.site().as_ref(), &iset.select(), &[], &[])
            .expect("mapper call")
            .is_empty()
    );
}

#[test]
fn bcu_mapper_never_allocates_a_new_unit() {
    let mut mapper = BcuMapper::new(test_bcu(1));
    let mut project = Project::new();
    let instr = DefaultInstructionSet.goto(BranchLabel::new(2));
    let mapping = mapper
        .try_allocate(&instr, &[], &[], &mut project)
        .expect("mapper call")
        .expect("handled");
    assert_eq!(project.unit_count(), 0);
    assert!(mapping.description().contains("goto"));

    let none = mapper
        .try_allocate(&DefaultInstructionSet.select(), &[], &[], &mut project)
        .expect("mapper call");
    assert!(none.is_none());
}

#[test]
fn mapped_goto_drives_the_program_counter() {
    let mut bench = BcuBench::new(4, 0b0000, 2);
    bench.set_reset(true);
    bench.tick();
    bench.set_reset(false);
    bench.drive_nop();
    // Latency 2: one masked post-reset cycle before branches land.
    assert_eq!(bench.tick().to_string(), "0001");

    let mapper = BcuMapper::new(bench.bcu.clone());
    let instr = DefaultInstructionSet.goto(BranchLabel::new(0b1010));
    let mappings = mapper
        .try_map(bench.site.as_ref(), &instr, &[], &[])
        .expect("mapper call");
    let verbs = mappings[0].realize(&[], &[]).expect("realize");
    assert_eq!(verbs.len(), 2);

    assert_eq!(bench.apply_and_tick(&verbs[0]).to_string(), "1010");
    // The padding verb holds the site with a NOP while the jump completes.
    assert_eq!(bench.apply_and_tick(&verbs[1]).to_string(), "1011");
}

#[test]
fn conditional_mapping_requires_an_operand() {
    let bench = BcuBench::new(4, 0b0000, 1);
    let mapper = BcuMapper::new(bench.bcu.clone());
    let instr = DefaultInstructionSet.branch_if_true(BranchLabel::new(1));
    let mappings = mapper
        .try_map(bench.site.as_ref(), &instr, &[TypeDescriptor::Bit], &[])
        .expect("mapper call");
    assert!(mappings[0].realize(&[], &[]).is_err());
}

#[test]
fn mux_allocation_creates_a_unit_of_operand_width() {
    let mut mapper = Mux2Mapper::new();
    let mut project = Project::new();
    let types = [
        TypeDescriptor::Bit,
        TypeDescriptor::Unsigned(16),
        TypeDescriptor::Unsigned(16),
    ];
    let mapping = mapper
        .try_allocate(
            &DefaultInstructionSet.select(),
            &types,
            &[TypeDescriptor::Unsigned(16)],
            &mut project,
        )
        .expect("mapper call")
        .expect("handled");

    assert_eq!(project.unit_count(), 1);
    assert_eq!(mapping.resource_kind(), ResourceKind::Lightweight);
    assert_eq!(mapping.latency(), 0);
    let site = mapping.site();
    let mux_site = site
        .as_any()
        .downcast_ref::<Mux2TransactionSite>()
        .expect("mux site");
    assert_eq!(mux_site.host().borrow().width(), 16);
}

#[test]
fn mux_allocation_rejects_widths_beyond_the_numeric_bound() {
    use crate::error::ModelError;
    use crate::logic::MAX_VECTOR_WIDTH;

    let mut mapper = Mux2Mapper::new();
    let mut project = Project::new();
    let types = [
        TypeDescriptor::Bit,
        TypeDescriptor::Vector(MAX_VECTOR_WIDTH + 1),
        TypeDescriptor::Vector(MAX_VECTOR_WIDTH + 1),
    ];
    let result = mapper.try_allocate(
        &DefaultInstructionSet.select(),
        &types,
        &[TypeDescriptor::Vector(MAX_VECTOR_WIDTH + 1)],
        &mut project,
    );
    assert!(matches!(result, Err(ModelError::OutOfRange { .. })));
    assert_eq!(project.unit_count(), 0);
}

#[test]
fn mux_mapper_declines_other_instructions_and_widths() {
    let mut mapper = Mux2Mapper::new();
    let mut project = Project::new();
    let none = mapper
        .try_allocate(
            &DefaultInstructionSet.goto(BranchLabel::new(0)),
            &[],
            &[],
            &mut project,
        )
        .expect("mapper call");
    assert!(none.is_none());
    assert_eq!(project.unit_count(), 0);

    // try_map on an existing site only matches equal widths.
    let types8 = [
        TypeDescriptor::Bit,
        TypeDescriptor::Vector(8),
        TypeDescriptor::Vector(8),
    ];
    let mapping = mapper
        .try_allocate(
            &DefaultInstructionSet.select(),
            &types8,
            &[TypeDescriptor::Vector(8)],
            &mut project,
        )
        .expect("mapper call")
        .expect("handled");
    let site = mapping.site();

    let remapped = mapper
        .try_map(site.as_ref(), &DefaultInstructionSet.select(), &types8, &[])
        .expect("mapper call");
    assert_eq!(remapped.len(), 1);

    let types9 = [
        TypeDescriptor::Bit,
        TypeDescriptor::Vector(9),
        TypeDescriptor::Vector(9),
    ];
    let mismatch = mapper
        .try_map(site.as_ref(), &DefaultInstructionSet.select(), &types9, &[])
        .expect("mapper call");
    assert!(mismatch.is_empty());
}

#[test]
fn select_realization_preserves_the_operand_routing() {
    let mut mapper = Mux2Mapper::new();
    let mut project = Project::new();
    let types = [
        TypeDescriptor::Bit,
        TypeDescriptor::Vector(4),
        TypeDescriptor::Vector(4),
    ];
    let mapping = mapper
        .try_allocate(
            &DefaultInstructionSet.select(),
            &types,
            &[TypeDescriptor::Vector(4)],
            &mut project,
        )
        .expect("mapper call")
        .expect("handled");

    // Bring the freshly allocated unit's ports into existence.
    let mut kernel = crate::kernel::Kernel::new();
    {
        let mut binder = crate::binder::KernelBinder::new(&mut kernel);
        mapping.site().establish(&mut binder).expect("establish");
    }

    let cond = crate::signal::vec_signal("cond", LogicVector::zeros(1));
    let then_v = crate::signal::vec_signal("then", LogicVector::zeros(4));
    let else_v = crate::signal::vec_signal("else", LogicVector::zeros(4));
    let sink = crate::signal::vec_signal("sink", LogicVector::zeros(4));

    let verbs = mapping
        .realize(
            &[cond.clone(), then_v.clone(), else_v.clone()],
            &[sink.clone()],
        )
        .expect("realize");
    assert_eq!(verbs.len(), 1);

    let site = mapping.site();
    let mux_site = site
        .as_any()
        .downcast_ref::<Mux2TransactionSite>()
        .expect("mux site");
    let host = mux_site.host().borrow();
    let (pa, pb, psel, pr) = (
        host.a().expect("a"),
        host.b().expect("b"),
        host.sel().expect("sel"),
        host.r().expect("r"),
    );

    let wired_to = |target: &VecSignal| -> VecSignal {
        let drive = verbs[0]
            .drives()
            .iter()
            .find(|d| Rc::ptr_eq(d.target(), target))
            .expect("port is driven");
        match drive.source() {
            DriveSource::Wire(s) => s.clone(),
            DriveSource::Const(_) => panic!("select wires, never sticks"),
        }
    };

    // a <- operands[1], b <- operands[0], sel <- operands[2], sink <- r.
    assert!(Rc::ptr_eq(&wired_to(&pa), &then_v));
    assert!(Rc::ptr_eq(&wired_to(&pb), &cond));
    assert!(Rc::ptr_eq(&wired_to(&psel), &else_v));
    assert!(Rc::ptr_eq(&wired_to(&sink), &pr));

    // Arity violations are programming errors, not declines.
    assert!(mapping.realize(&[cond.clone()], &[sink.clone()]).is_err());
    assert!(
        mapping
            .realize(&[cond, then_v, else_v], &[])
            .is_err()
    );
}
