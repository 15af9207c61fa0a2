use num_traits::Float;
use numbat::{independent, record, record_multi, Tracked};
use proptest::prelude::*;

type T = Tracked<f64>;

// ===== Functions under test =====

fn inner(x: &[T]) -> Vec<T> {
    vec![
        x[0] * x[1] + x[0].sin(),
        (x[1] * x[1] + 1.0).ln() - x[0].exp(),
    ]
}

fn outer(u: &[T]) -> T {
    u[0].atan() * u[1].cosh() + (u[0] * u[0] + u[1] * u[1] + 1.0).sqrt()
}

fn mixed(x: &[T]) -> Vec<T> {
    let r = (x[0] * x[0] + x[1] * x[1] + 0.5).sqrt();
    vec![
        r.tanh() * x[1] - x[0] / r,
        (x[0] - x[1]).cos().powi(2) + x[0].exp_m1(),
        x[0].max(x[1]) * r,
    ]
}

fn arb_point() -> impl Strategy<Value = [f64; 2]> {
    prop::array::uniform2(-2.0f64..2.0)
}

fn arb_weights() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-1.0f64..1.0)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-10 * (1.0 + a.abs().max(b.abs()))
}

// ===== Property Tests =====

proptest! {
    #[test]
    fn prop_replay_is_bit_identical(x0 in arb_point(), x in arb_point()) {
        let mut f = record_multi(mixed, &x0).unwrap();
        let y1 = f.forward(0, &x).unwrap();
        let y2 = f.forward(0, &x).unwrap();
        for (a, b) in y1.iter().zip(&y2) {
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn prop_replay_matches_live_values(x in arb_point()) {
        let (recording, v) = independent(&x).unwrap();
        let y = mixed(&v);
        let live: Vec<f64> = y.iter().map(|t| t.value()).collect();
        let mut f = recording.freeze(&y).unwrap();
        let replayed = f.forward(0, &x).unwrap();
        for (a, b) in replayed.iter().zip(&live) {
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn prop_forward_and_reverse_agree(x0 in arb_point(), x in arb_point(), w in arb_weights()) {
        let mut f = record_multi(mixed, &x0).unwrap();
        f.forward(0, &x).unwrap();
        let dw = f.reverse(0, &w).unwrap();
        for j in 0..2 {
            let mut e = [0.0; 2];
            e[j] = 1.0;
            let dy = f.forward(1, &e).unwrap();
            let directional: f64 = dy.iter().zip(&w).map(|(a, b)| a * b).sum();
            prop_assert!(close(directional, dw[j]), "j = {}: {} vs {}", j, directional, dw[j]);
        }
    }

    #[test]
    fn prop_first_order_reverse_carries_gradient(x in arb_point(), v in arb_point(), w in arb_weights()) {
        let mut f = record_multi(mixed, &x).unwrap();
        f.forward(0, &x).unwrap();
        let g = f.reverse(0, &w).unwrap();
        f.forward(1, &v).unwrap();
        let dw = f.reverse(1, &w).unwrap();
        for j in 0..2 {
            prop_assert!(close(dw[j * 2 + 1], g[j]));
        }
    }

    #[test]
    fn prop_composition_matches_separate_tapes(x in arb_point()) {
        let mut whole = record(|v| outer(&inner(v)), &[0.1, 0.2]).unwrap();
        let mut g = record_multi(inner, &[0.1, 0.2]).unwrap();
        let mut f = record(outer, &[0.3, 0.4]).unwrap();

        let direct = whole.forward(0, &x).unwrap();
        let u = g.forward(0, &x).unwrap();
        let composed = f.forward(0, &u).unwrap();
        prop_assert_eq!(direct[0].to_bits(), composed[0].to_bits());
    }

    #[test]
    fn prop_rounding_has_no_higher_orders(x in -5.0f64..5.0, dx in -3.0f64..3.0) {
        let mut f = record_multi(|v| vec![v[0].floor(), v[0].round() * v[0]], &[0.5]).unwrap();
        let y = f.forward(0, &[x]).unwrap();
        prop_assert_eq!(y[0], x.floor());
        let dy = f.forward(1, &[dx]).unwrap();
        prop_assert_eq!(dy[0], 0.0);
        prop_assert!(close(dy[1], x.round() * dx));
    }
}
