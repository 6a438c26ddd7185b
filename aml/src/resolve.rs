use crate::{
    object::{Object, ObjectType},
    op_info::{lookup_opcode_info, ArgKind},
    opcode::Opcode,
    operand::{Operand, OperandStack},
    store::ObjectStore,
    AmlError,
    DebugVerbosity,
};
use core::mem;
use log::{trace, warn};

/// Prepare the operands of `opcode` for its semantic action. Each operand the opcode requires is
/// checked against the kind the opcode expects in that position, and resolved in place on
/// `stack` if the kind calls for a value. Operands are resolved starting from the top of the
/// stack.
///
/// Resolution stops at the first operand that fails, leaving the operands that were already
/// resolved in their resolved state.
pub fn resolve_operands<S>(store: &mut S, opcode: u16, stack: &mut OperandStack) -> Result<(), AmlError>
where
    S: ObjectStore + ?Sized,
{
    let info = lookup_opcode_info(opcode).ok_or(AmlError::BadOpcode(opcode))?;
    let args = info.runtime_args.ok_or(AmlError::NoRuntimeArgs(info.opcode))?;
    let verbosity = store.debug_verbosity();

    if verbosity == DebugVerbosity::All {
        trace!("Resolving operands of {}: {:?}", info.opcode, args);
    }

    let available = stack.len();
    let mut slots = stack.top_down_mut();
    for (depth, kind) in args.resolution_order().enumerate() {
        let result = match slots.next() {
            Some(slot) => resolve_slot(store, info.opcode, kind, depth, slot),
            None => Err(AmlError::OperandStackUnderflow { required: args.len(), available }),
        };

        if let Err(err) = result {
            if verbosity >= DebugVerbosity::Failures {
                warn!("Failed to resolve operand {} of {} as {:?}: {:?}", depth, info.opcode, kind, err);
            }
            return Err(err);
        }
    }

    Ok(())
}

fn resolve_slot<S>(
    store: &mut S,
    opcode: Opcode,
    kind: ArgKind,
    depth: usize,
    slot: &mut Option<Operand>,
) -> Result<(), AmlError>
where
    S: ObjectStore + ?Sized,
{
    let operand = slot.as_mut().ok_or(AmlError::EmptyStackSlot(depth))?;
    let typ = classify(store, operand)?;

    if store.debug_verbosity() == DebugVerbosity::All {
        trace!("Operand {}: {} ({:?}), required as {:?}", depth, operand, typ, kind);
    }

    match kind {
        ArgKind::Reference | ArgKind::TargetRef => {
            if let Operand::Named(_) = operand {
                return Ok(());
            }
            if typ != ObjectType::Reference {
                return Err(AmlError::OperandTypeMismatch { required: kind, got: typ });
            }
            collapse_name_reference(store, operand)
        }

        ArgKind::Number => resolve_expecting(store, kind, operand, &[ObjectType::Integer]),
        ArgKind::String => resolve_expecting(store, kind, operand, &[ObjectType::String, ObjectType::Buffer]),
        ArgKind::Buffer => resolve_expecting(store, kind, operand, &[ObjectType::Buffer]),
        ArgKind::Mutex => resolve_expecting(store, kind, operand, &[ObjectType::Mutex]),
        ArgKind::Event => resolve_expecting(store, kind, operand, &[ObjectType::Event]),
        ArgKind::Region => resolve_expecting(store, kind, operand, &[ObjectType::OpRegion]),
        ArgKind::Package => resolve_expecting(store, kind, operand, &[ObjectType::Package]),
        ArgKind::ComplexObject => {
            resolve_expecting(store, kind, operand, &[ObjectType::Buffer, ObjectType::Package])
        }

        ArgKind::AnyType => {
            /*
             * `Store` into an element of a package or buffer must keep the element reference:
             * resolving it would store into a copy of the element.
             */
            let is_element = operand.as_reference().is_some_and(|reference| reference.op == Opcode::Index);
            if opcode == Opcode::Store && is_element {
                return Ok(());
            }
            store.resolve_to_value(operand)
        }

        ArgKind::DataObject => {
            store.resolve_to_value(operand)?;
            if let Some(reference) = operand.as_reference() {
                return match reference.node() {
                    Some(_) => Ok(()),
                    None => Err(AmlError::UnboundReference),
                };
            }
            match operand_type(store, operand)? {
                ObjectType::Buffer | ObjectType::String | ObjectType::Package => Ok(()),
                got => Err(AmlError::OperandTypeMismatch { required: kind, got }),
            }
        }

        ArgKind::ConditionalExpr => match typ {
            ObjectType::IfContext => Ok(()),
            _ => Err(AmlError::OperandTypeMismatch { required: kind, got: typ }),
        },
    }
}

/// Find the type of an operand as it sits on the stack, and check it is something the
/// interpreter could have pushed there.
fn classify<S>(store: &S, operand: &Operand) -> Result<ObjectType, AmlError>
where
    S: ObjectStore + ?Sized,
{
    if let Some(reference) = operand.as_reference() {
        if !reference.op.produces_operand_reference() {
            return Err(AmlError::IllegalReferenceOpcode(reference.op));
        }
    }
    operand_type(store, operand)
}

fn operand_type<S>(store: &S, operand: &Operand) -> Result<ObjectType, AmlError>
where
    S: ObjectStore + ?Sized,
{
    match operand {
        Operand::Named(node) => store.node_type(*node).ok_or(AmlError::UnknownNode(*node)),
        Operand::Object(object) => Ok(object.typ()),
    }
}

fn resolve_expecting<S>(
    store: &mut S,
    kind: ArgKind,
    operand: &mut Operand,
    expected: &[ObjectType],
) -> Result<(), AmlError>
where
    S: ObjectStore + ?Sized,
{
    store.resolve_to_value(operand)?;
    let typ = operand_type(store, operand)?;
    if expected.contains(&typ) {
        Ok(())
    } else {
        Err(AmlError::OperandTypeMismatch { required: kind, got: typ })
    }
}

/// A reference produced by a name is replaced on the stack by a direct handle to the named
/// object. Other references are left for the opcode to use as they are.
fn collapse_name_reference<S>(store: &mut S, operand: &mut Operand) -> Result<(), AmlError>
where
    S: ObjectStore + ?Sized,
{
    let node = match operand.as_reference() {
        Some(reference) if reference.op == Opcode::Name => {
            reference.node().ok_or(AmlError::ReferenceWithoutTarget(Opcode::Name))?
        }
        _ => return Ok(()),
    };

    if let Operand::Object(reference) = mem::replace(operand, Operand::Named(node)) {
        store.release(reference);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        object::{OpRegion, Reference, RegionSpace, WrappedObject},
        test_utils::{same_operand, stack_of, FakeStore},
        ErrorKind,
    };
    use alloc::{string::String, vec, vec::Vec};

    fn reference(op: Opcode) -> Operand {
        Object::Reference(Reference::new(op)).into()
    }

    fn int(value: u64) -> Operand {
        Object::Integer(value).into()
    }

    fn string(value: &str) -> Operand {
        Object::String(String::from(value)).into()
    }

    fn assert_unchanged(before: &[Option<Operand>], after: &OperandStack) {
        assert_eq!(before.len(), after.len());
        for (depth, slot) in before.iter().rev().enumerate() {
            match (slot, after.get(depth)) {
                (Some(before), Some(after)) => assert!(same_operand(before, after), "operand {} changed", depth),
                (None, None) => (),
                _ => panic!("slot {} changed", depth),
            }
        }
    }

    #[test]
    fn unknown_opcode() {
        let mut store = FakeStore::new();
        let mut stack = stack_of([int(1)]);
        let err = resolve_operands(&mut store, 0x41, &mut stack).unwrap_err();
        assert_eq!(err, AmlError::BadOpcode(0x41));
        assert_eq!(err.kind(), ErrorKind::BadOpcode);
    }

    #[test]
    fn opcode_without_runtime_args() {
        let mut store = FakeStore::new();
        let err = resolve_operands(&mut store, 0x10, &mut OperandStack::new()).unwrap_err();
        assert_eq!(err, AmlError::NoRuntimeArgs(Opcode::Scope));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn no_operands_required() {
        let mut store = FakeStore::new();

        assert_eq!(resolve_operands(&mut store, 0xa3, &mut OperandStack::new()), Ok(()));

        // Whatever is on the stack is not looked at
        let slots = vec![None, Some(reference(Opcode::RefOf))];
        let mut stack = OperandStack::from_slots(slots.clone());
        assert_eq!(resolve_operands(&mut store, 0xa3, &mut stack), Ok(()));
        assert_unchanged(&slots, &stack);
        assert_eq!(store.resolutions, 0);
    }

    #[test]
    fn empty_slot() {
        let mut store = FakeStore::new();
        let mut stack = OperandStack::from_slots(vec![None]);
        let err = resolve_operands(&mut store, 0x5b21, &mut stack).unwrap_err();
        assert_eq!(err, AmlError::EmptyStackSlot(0));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn stack_too_short() {
        let mut store = FakeStore::new();
        store.locals[0] = Some(Object::Integer(0).wrap());

        // Add wants two numbers and a target, but only the target and one number were pushed
        let mut stack = stack_of([int(1), reference(Opcode::Local(0))]);
        let err = resolve_operands(&mut store, 0x72, &mut stack).unwrap_err();
        assert_eq!(err, AmlError::OperandStackUnderflow { required: 3, available: 2 });
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn stale_node() {
        let mut store = FakeStore::new();
        let node = store.add_node("\\TMP0", Object::Integer(3));
        store.namespace.remove(node).unwrap();

        let mut stack = stack_of([Operand::Named(node)]);
        let err = resolve_operands(&mut store, 0x5b21, &mut stack).unwrap_err();
        assert_eq!(err, AmlError::UnknownNode(node));
        assert_eq!(err.kind(), ErrorKind::OperandType);
    }

    #[test]
    fn name_references_collapse_to_nodes() {
        let mut store = FakeStore::new();
        let node = store.add_node("\\_SB.CNT0", Object::Integer(5));
        let name_ref = Object::Reference(Reference::to_node(node)).wrap();

        // Increment(CNT0)
        let mut stack = stack_of([Operand::Object(name_ref.clone())]);
        resolve_operands(&mut store, 0x75, &mut stack).unwrap();

        assert!(matches!(stack.get(0), Some(Operand::Named(n)) if *n == node));
        assert_eq!(store.released.len(), 1);
        assert!(store.released[0].ptr_eq(&name_ref));
        assert_eq!(store.resolutions, 0);
    }

    #[test]
    fn store_target_collapses() {
        let mut store = FakeStore::new();
        let node = store.add_node("\\_SB.CNT0", Object::Integer(5));
        let value = Object::Integer(8).wrap();

        // Store(8, CNT0)
        let target: Operand = Object::Reference(Reference::to_node(node)).into();
        let mut stack = stack_of([Operand::Object(value.clone()), target]);
        resolve_operands(&mut store, 0x70, &mut stack).unwrap();

        assert!(matches!(stack.get(0), Some(Operand::Named(n)) if *n == node));
        assert!(stack.get(1).unwrap().object().unwrap().ptr_eq(&value));
        assert_eq!(store.released.len(), 1);
    }

    #[test]
    fn other_references_are_kept() {
        let mut store = FakeStore::new();
        let local = Object::Reference(Reference::new(Opcode::Local(1))).wrap();

        // Increment(Local1)
        let mut stack = stack_of([Operand::Object(local.clone())]);
        resolve_operands(&mut store, 0x75, &mut stack).unwrap();

        assert!(stack.get(0).unwrap().object().unwrap().ptr_eq(&local));
        assert!(store.released.is_empty());
    }

    #[test]
    fn targets_must_be_references() {
        let mut store = FakeStore::new();
        let mut stack = stack_of([int(1), int(2)]);
        assert_eq!(
            resolve_operands(&mut store, 0x70, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::TargetRef, got: ObjectType::Integer })
        );
    }

    #[test]
    fn illegal_reference_producers() {
        let mut store = FakeStore::new();

        // RefOf never produces an operand reference itself. Check it's rejected in a position of
        // each broad kind.
        let cases: [(u16, Vec<Operand>); 5] = [
            (0x75, vec![reference(Opcode::RefOf)]),
            (0x92, vec![reference(Opcode::RefOf)]),
            (0xa4, vec![reference(Opcode::RefOf)]),
            (0x70, vec![int(0), reference(Opcode::RefOf)]),
            (0x87, vec![reference(Opcode::CondRefOf)]),
        ];
        for (opcode, operands) in cases {
            let mut stack = stack_of(operands);
            let err = resolve_operands(&mut store, opcode, &mut stack).unwrap_err();
            assert!(matches!(err, AmlError::IllegalReferenceOpcode(Opcode::RefOf | Opcode::CondRefOf)));
            assert_eq!(err.kind(), ErrorKind::OperandType);
        }
        assert_eq!(store.resolutions, 0);
    }

    #[test]
    fn numbers() {
        let mut store = FakeStore::new();
        store.locals[3] = Some(Object::Integer(0x10).wrap());

        // Not(Local3, Local4)
        let mut stack = stack_of([reference(Opcode::Local(3)), reference(Opcode::Local(4))]);
        resolve_operands(&mut store, 0x80, &mut stack).unwrap();
        assert_eq!(stack.get(1).unwrap().object().unwrap().as_integer(), Ok(0x10));

        let mut stack = stack_of([string("10"), reference(Opcode::Local(4))]);
        assert_eq!(
            resolve_operands(&mut store, 0x80, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::Number, got: ObjectType::String })
        );
    }

    #[test]
    fn strings_accept_buffers() {
        let mut store = FakeStore::new();

        let slots = vec![
            Some(Object::Buffer(vec![0x41, 0x42]).into()),
            Some(string("CD")),
            Some(reference(Opcode::Local(0))),
        ];
        let mut stack = OperandStack::from_slots(slots.clone());
        resolve_operands(&mut store, 0x73, &mut stack).unwrap();
        assert_unchanged(&slots, &stack);

        let mut stack = stack_of([Object::Package(vec![]).into(), string("CD"), reference(Opcode::Local(0))]);
        assert_eq!(
            resolve_operands(&mut store, 0x73, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::String, got: ObjectType::Package })
        );
    }

    #[test]
    fn store_keeps_element_references() {
        let mut store = FakeStore::new();

        // The fake store can't resolve element references, so any attempt to would fail
        let element = Object::Reference(Reference::to_element(Object::Integer(0).wrap(), 4)).wrap();
        let slots = vec![Some(Operand::Object(element.clone())), Some(reference(Opcode::Local(0)))];

        let mut stack = OperandStack::from_slots(slots.clone());
        assert_eq!(resolve_operands(&mut store, 0x70, &mut stack), Ok(()));
        assert_unchanged(&slots, &stack);
        assert_eq!(store.resolutions, 0);

        // Any other opcode taking an `AnyType` does resolve it
        let mut stack = OperandStack::from_slots(slots.clone());
        assert_eq!(
            resolve_operands(&mut store, 0x9d, &mut stack),
            Err(AmlError::ReferenceWithoutTarget(Opcode::Index))
        );
        assert_eq!(store.resolutions, 1);
    }

    #[test]
    fn size_of() {
        let mut store = FakeStore::new();
        let device = store.add_node("\\_SB.PCI0", Object::Device);

        store.locals[0] = Some(Object::Reference(Reference::to_node(device)).wrap());
        store.locals[1] = Some(Object::Reference(Reference::new(Opcode::Local(6))).wrap());
        store.locals[2] = Some(Object::Integer(4).wrap());

        for operand in [reference(Opcode::Local(0)), string("ABCD"), Object::Package(vec![]).into()] {
            let mut stack = stack_of([operand]);
            assert_eq!(resolve_operands(&mut store, 0x87, &mut stack), Ok(()));
        }

        let mut stack = stack_of([reference(Opcode::Local(1))]);
        let err = resolve_operands(&mut store, 0x87, &mut stack).unwrap_err();
        assert_eq!(err, AmlError::UnboundReference);
        assert_eq!(err.kind(), ErrorKind::OperandType);

        let mut stack = stack_of([reference(Opcode::Local(2))]);
        assert_eq!(
            resolve_operands(&mut store, 0x87, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::DataObject, got: ObjectType::Integer })
        );
    }

    #[test]
    fn size_of_objects_without_a_value() {
        let mut store = FakeStore::new();
        let device = store.add_node("\\_SB.PCI0", Object::Device);
        let method = store.add_node(
            "\\_SB._STA",
            Object::Method { code: vec![0xa4, 0x0a, 0x0f], flags: crate::object::MethodFlags(0) },
        );

        for (node, typ) in [(device, ObjectType::Device), (method, ObjectType::Method)] {
            let mut stack = stack_of([Operand::Named(node)]);
            let err = resolve_operands(&mut store, 0x87, &mut stack).unwrap_err();
            assert_eq!(err, AmlError::OperandTypeMismatch { required: ArgKind::DataObject, got: typ });
            assert_eq!(err.kind(), ErrorKind::OperandType);
        }

        // A reference to a name is resolved to the named object first, so gets the same treatment
        let mut stack = stack_of([Object::Reference(Reference::to_node(method)).into()]);
        assert_eq!(
            resolve_operands(&mut store, 0x87, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::DataObject, got: ObjectType::Method })
        );
    }

    #[test]
    fn else_needs_if_context() {
        let mut store = FakeStore::new();

        let mut stack = stack_of([Object::IfContext { predicate: false }.into()]);
        assert_eq!(resolve_operands(&mut store, 0xa1, &mut stack), Ok(()));
        assert_eq!(store.resolutions, 0);

        let mut stack = stack_of([int(0)]);
        assert_eq!(
            resolve_operands(&mut store, 0xa1, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::ConditionalExpr, got: ObjectType::Integer })
        );
    }

    #[test]
    fn named_sync_objects() {
        let mut store = FakeStore::new();
        let mutex = store.add_node("\\_SB.MTX0", Object::Mutex { sync_level: 0 });
        let event = store.add_node("\\_SB.EVT0", Object::Event);

        // Acquire(MTX0, 0xffff)
        let mut stack = stack_of([Operand::Named(mutex), int(0xffff)]);
        assert_eq!(resolve_operands(&mut store, 0x5b23, &mut stack), Ok(()));

        // Acquire(EVT0, 0xffff)
        let mut stack = stack_of([Operand::Named(event), int(0xffff)]);
        assert_eq!(
            resolve_operands(&mut store, 0x5b23, &mut stack),
            Err(AmlError::OperandTypeMismatch { required: ArgKind::Mutex, got: ObjectType::Event })
        );
    }

    #[test]
    fn resolving_again_changes_nothing() {
        let mut store = FakeStore::new();
        let target = store.add_node("\\_SB.TGT0", Object::Device);
        let region = store.add_node(
            "\\_SB.REG0",
            Object::OpRegion(OpRegion { space: RegionSpace::SystemMemory, base: 0xfed40000, length: 0x1000 }),
        );
        let package: WrappedObject = Object::Package(vec![Object::Integer(1).wrap()]).wrap();

        let cases: [(u16, Vec<Operand>); 8] = [
            (0x5b21, vec![int(50)]),
            (0x73, vec![string("A"), string("B"), Operand::Named(target)]),
            (
                0x84,
                vec![Object::Buffer(vec![0x79, 0]).into(), Object::Buffer(vec![]).into(), Operand::Named(target)],
            ),
            (0x5b24, vec![Object::Event.into()]),
            (0x5b20, vec![Operand::Named(region), Operand::Named(target)]),
            (0x89, vec![Operand::Object(package.clone()), int(0), int(1), int(0), int(1), int(0)]),
            (0x88, vec![Operand::Object(package), int(0), Operand::Named(target)]),
            (0xa4, vec![reference(Opcode::Debug)]),
        ];
        for (opcode, operands) in cases {
            let slots: Vec<_> = operands.into_iter().map(Some).collect();
            let mut stack = OperandStack::from_slots(slots.clone());

            resolve_operands(&mut store, opcode, &mut stack).unwrap();
            assert_unchanged(&slots, &stack);
            resolve_operands(&mut store, opcode, &mut stack).unwrap();
            assert_unchanged(&slots, &stack);
        }
    }

    #[test]
    fn resolved_operands_stay_resolved_on_failure() {
        let mut store = FakeStore::new();
        let value = Object::Integer(3).wrap();
        store.locals[0] = Some(value.clone());

        // Add("x", Local0, Local2)
        let mut stack = stack_of([string("x"), reference(Opcode::Local(0)), reference(Opcode::Local(2))]);
        let err = resolve_operands(&mut store, 0x72, &mut stack).unwrap_err();
        assert_eq!(err, AmlError::OperandTypeMismatch { required: ArgKind::Number, got: ObjectType::String });

        // Local0 has already been replaced by its value
        assert!(stack.get(1).unwrap().object().unwrap().ptr_eq(&value));
    }

    #[test]
    fn trait_objects() {
        let mut store = FakeStore::new();
        let store: &mut dyn ObjectStore = &mut store;
        let mut stack = stack_of([reference(Opcode::Zero)]);
        resolve_operands(store, 0x5b22, &mut stack).unwrap();
        assert_eq!(stack.get(0).unwrap().object().unwrap().as_integer(), Ok(0));
    }
}
