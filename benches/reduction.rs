//! Benchmarks for unification, reduction and type inference.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use metta_kernel::grounded::GroundedRegistry;
use metta_kernel::parser::parse_term;
use metta_kernel::reduce::Reducer;
use metta_kernel::space::Space;
use metta_kernel::term::Term;
use metta_kernel::types::checker::TypeChecker;
use metta_kernel::unify::unify;

fn nested(depth: usize) -> Term {
    (0..depth).fold(Term::atom("leaf"), |acc, i| {
        Term::apply(Term::atom("node"), vec![Term::number(i as f64), acc])
    })
}

fn bench_unify(c: &mut Criterion) {
    let pattern = parse_term("(node $i (node $j $rest))").unwrap();
    let term = nested(64);

    c.bench_function("unify_nested_64", |bench| {
        bench.iter(|| black_box(unify(&pattern, &term)))
    });
}

fn bench_fact(c: &mut Criterion) {
    let mut space = Space::new();
    space.add_rule(parse_term("(fact 0)").unwrap(), Term::number(1.0));
    space.add_rule(
        parse_term("(fact $n)").unwrap(),
        parse_term("(&* $n (fact (&- $n 1)))").unwrap(),
    );
    let grounded = GroundedRegistry::with_builtins();
    let reducer = Reducer::new(&space, &grounded);
    let expr = parse_term("(fact 20)").unwrap();

    c.bench_function("normalize_fact_20", |bench| {
        bench.iter(|| black_box(reducer.normalize(&expr).unwrap()))
    });
}

fn bench_infer(c: &mut Criterion) {
    let checker = TypeChecker::hindley_milner();
    let expr = parse_term("((λ $f ($f ($f 1))) (λ $x (&+ $x 1)))").unwrap();

    c.bench_function("infer_higher_order", |bench| {
        bench.iter(|| black_box(checker.infer(&expr).unwrap()))
    });
}

criterion_group!(benches, bench_unify, bench_fact, bench_infer);
criterion_main!(benches);
