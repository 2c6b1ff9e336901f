use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use real_expressions::{Bindings, Decimal, Evaluator, Gradient, Real, count_depth, count_nodes, derive};

const N_PARAMS: usize = 5;
const GRAPH_SIZE: usize = 40;
const N_GRAPHS: usize = 50;

fn random_constant<R: Rng>(rng: &mut R) -> Real {
    Real::constant(Decimal::ratio(rng.random_range(-20..20), 8))
}

/// A random graph whose new nodes draw operands from all earlier ones, so sharing is common.
fn gen_random_graph<R: Rng>(rng: &mut R, params: &[Real], target_size: usize) -> Real {
    let mut nodes: Vec<Real> = params.to_vec();
    nodes.push(random_constant(rng));

    while nodes.len() < target_size {
        let a = nodes[rng.random_range(0..nodes.len())].clone();
        let b = nodes[rng.random_range(0..nodes.len())].clone();
        let next = match rng.random_range(0..6) {
            0 => &a + &b,
            1 => &a - &b,
            2 => &a * &b,
            3 => a.sin(),
            4 => a.tanh(),
            _ => Real::if_(&Real::compare(&a, &b), &a, &b),
        };
        nodes.push(next);
    }

    nodes.pop().unwrap_or_else(Real::zero)
}

fn bench_eval(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let params: Vec<Real> = (0..N_PARAMS).map(|_| Real::parameter(Real::zero())).collect();
    let graphs: Vec<Real> = (0..N_GRAPHS)
        .map(|_| gen_random_graph(&mut rng, &params, GRAPH_SIZE))
        .collect();
    let mut bindings = Bindings::new();
    for (i, p) in params.iter().enumerate() {
        bindings.bind(p, Decimal::ratio(i as i64 + 1, 4));
    }

    let mut group = c.benchmark_group("evaluation");
    group.bench_function(BenchmarkId::from_parameter("eval"), |b| {
        b.iter(|| {
            for g in &graphs {
                let _ = Evaluator::new(&bindings).evaluate(g);
            }
        })
    });

    group.bench_function(BenchmarkId::from_parameter("gradient"), |b| {
        b.iter(|| {
            for g in &graphs {
                let _ = derive(&params, g);
            }
        })
    });

    let gradients: Vec<Vec<Real>> = graphs.iter().map(|g| derive(&params, g)).collect();
    group.bench_function(BenchmarkId::from_parameter("eval_gradient"), |b| {
        b.iter(|| {
            for grads in &gradients {
                let mut ev = Evaluator::new(&bindings);
                for g in grads {
                    let _ = ev.evaluate(g);
                }
            }
        })
    });
    group.finish();
}

fn bench_utilities(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let params: Vec<Real> = (0..N_PARAMS).map(|_| Real::parameter(Real::zero())).collect();
    let graphs: Vec<Real> = (0..N_GRAPHS)
        .map(|_| gen_random_graph(&mut rng, &params, GRAPH_SIZE))
        .collect();

    let mut group = c.benchmark_group("utilities");
    group.bench_function(BenchmarkId::from_parameter("counting"), |b| {
        b.iter(|| {
            for g in &graphs {
                let _ = count_nodes(g);
                let _ = count_depth(g);
            }
        })
    });
    group.bench_function(BenchmarkId::from_parameter("adjoints"), |b| {
        b.iter(|| {
            for g in &graphs {
                let _ = Gradient::new(g).expanded_nodes();
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_eval, bench_utilities);
criterion_main!(benches);
