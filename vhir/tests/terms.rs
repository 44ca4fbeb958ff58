use vhir::prelude::*;

fn sym(id: u32, name: &str, ty: TypeDescriptor) -> SymbolicValue {
    SymbolicValue::new(SymbolId(id), name, ty)
}

#[test]
fn evaluation_wraps_at_width() {
    let x = sym(0, "x", TypeDescriptor::I8);
    let t = x.term() + Term::int(IType::I8, 1);

    let mut env = Assignment::new();
    env.insert(x.id(), Value::int(IType::I8, 255));
    assert_eq!(t.eval(&env).unwrap(), Value::int(IType::I8, 0));
}

#[test]
fn signed_and_unsigned_comparisons_differ() {
    let x = sym(0, "x", TypeDescriptor::I8);
    let zero = Term::int(IType::I8, 0);

    let mut env = Assignment::new();
    env.insert(x.id(), Value::int(IType::I8, 0x80));

    assert!(!x.term().ult(zero.clone()).eval(&env).unwrap().is_true());
    assert!(x.term().slt(zero).eval(&env).unwrap().is_true());
}

#[test]
fn aggregate_elements_are_typed() {
    let pair = sym(0, "pair", TypeDescriptor::array(TypeDescriptor::I16, 2));
    let first = pair.term().extract(0);
    assert_eq!(first.type_of().unwrap(), TypeDescriptor::I16);

    let out_of_bounds = pair.term().extract(2);
    assert!(matches!(
        out_of_bounds.type_of(),
        Err(TypeError::BadExtract { index: 2, .. })
    ));

    let bad = Term::Aggregate {
        ty: TypeDescriptor::array(TypeDescriptor::I8, 2),
        elements: vec![Term::int(IType::I8, 1), Term::int(IType::I16, 2)],
    };
    assert!(matches!(
        bad.type_of(),
        Err(TypeError::ElementType { index: 1, .. })
    ));
}

#[test]
fn structures_infer_their_layout() {
    let s = Term::structure(vec![Term::int(IType::I32, 7), Term::bool(false)]).unwrap();
    assert_eq!(
        s.type_of().unwrap(),
        TypeDescriptor::structure([TypeDescriptor::I32, TypeDescriptor::BOOL])
    );
    assert_eq!(s.to_string(), "{ 7, false }");
}

#[test]
fn free_symbols_are_deduplicated() {
    let x = sym(0, "x", TypeDescriptor::I32);
    let y = sym(1, "x", TypeDescriptor::I32);
    let t = (x.term() * x.term()).equals(y.term());
    let symbols: Vec<_> = t.free_symbols().into_iter().collect();
    assert_eq!(symbols, vec![SymbolId(0), SymbolId(1)]);
}

#[test]
fn simplification_preserves_value() {
    let x = sym(0, "x", TypeDescriptor::I8);
    let t = Term::ite(
        x.term().ule(x.term()),
        (x.term() ^ x.term()) + Term::int(IType::I8, 3),
        Term::int(IType::I8, 9),
    );
    let simplified = t.apply_identities();
    assert_eq!(simplified, Term::int(IType::I8, 3));

    for v in [0u64, 1, 127, 200, 255] {
        let mut env = Assignment::new();
        env.insert(x.id(), Value::int(IType::I8, v));
        assert_eq!(t.eval(&env).unwrap(), simplified.eval(&env).unwrap());
    }
}
