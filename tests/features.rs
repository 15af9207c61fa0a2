use approx::assert_relative_eq;
use num_traits::Float;
use numbat::{
    cond_exp, cond_exp_gt, cond_exp_lt, independent, print_for, record, record_multi, AdError,
    Atomic, AtomicFunction, CompareOp, Discrete, Function, OpCode, Recorder, Tracked, VecAd,
};

// ══════════════════════════════════════════════
//  1. Conditional expressions
// ══════════════════════════════════════════════

#[test]
fn cond_exp_is_redecided_on_replay() {
    let mut f = record(|x| cond_exp_lt(x[0], x[1], x[0] * x[0], x[1] * 3.0), &[1.0, 2.0]).unwrap();

    assert_eq!(f.forward(0, &[1.0, 2.0]).unwrap(), vec![1.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![2.0, 0.0]);

    assert_eq!(f.forward(0, &[3.0, 2.0]).unwrap(), vec![6.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![0.0, 3.0]);
    assert_eq!(f.compare_change_count(), 0);
}

#[test]
fn cond_exp_higher_orders_follow_the_branch() {
    let mut f = record(|x| cond_exp(CompareOp::Ge, x[0], Tracked::constant(0.0), x[0].exp(), x[0].sin()), &[1.0])
        .unwrap();
    let y = f.forward(2, &[0.5, 1.0, 0.0]).unwrap();
    let e = 0.5_f64.exp();
    assert_relative_eq!(y[0], e, max_relative = 1e-15);
    assert_relative_eq!(y[1], e, max_relative = 1e-15);
    assert_relative_eq!(y[2], e / 2.0, max_relative = 1e-15);

    let y = f.forward(2, &[-0.5, 1.0, 0.0]).unwrap();
    assert_relative_eq!(y[0], (-0.5_f64).sin(), max_relative = 1e-15);
    assert_relative_eq!(y[1], (-0.5_f64).cos(), max_relative = 1e-15);
    assert_relative_eq!(y[2], 0.5_f64.sin() / 2.0, max_relative = 1e-14);
}

#[test]
fn untaken_branch_does_not_poison_derivatives() {
    // 1 / x and ln(x) are evaluated at x = 0 but never selected.
    let mut f = record(
        |x| {
            let zero = Tracked::constant(0.0);
            cond_exp_gt(x[0], zero, x[0].recip() + x[0].ln(), x[0] * 2.0)
        },
        &[1.0],
    )
    .unwrap();
    assert_eq!(f.forward(0, &[0.0]).unwrap(), vec![0.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![2.0]);
    f.forward(1, &[1.0]).unwrap();
    let dw = f.reverse(1, &[1.0]).unwrap();
    assert_eq!(dw, vec![0.0, 2.0]);

    // x^2.5 has a zero base at x = 0.
    let mut f = record(
        |x| {
            let zero = Tracked::constant(0.0);
            cond_exp_gt(x[0], zero, x[0].powf(Tracked::constant(2.5)), x[0] * 2.0)
        },
        &[1.0],
    )
    .unwrap();
    assert_eq!(f.forward(0, &[0.0]).unwrap(), vec![0.0]);
    f.forward(1, &[1.0]).unwrap();
    assert_eq!(f.reverse(1, &[1.0]).unwrap(), vec![0.0, 2.0]);
}

#[test]
fn cbrt_sign_is_redecided_on_replay() {
    let mut f = record(|x| x[0].cbrt(), &[8.0]).unwrap();
    assert_relative_eq!(f.forward(0, &[8.0]).unwrap()[0], 2.0, max_relative = 1e-15);
    assert_relative_eq!(f.forward(0, &[-8.0]).unwrap()[0], -2.0, max_relative = 1e-15);
    // d/dx cbrt(x) = 1 / (3 x^(2/3))
    assert_relative_eq!(f.reverse(0, &[1.0]).unwrap()[0], 1.0 / 12.0, max_relative = 1e-14);
    assert_eq!(f.forward(0, &[0.0]).unwrap(), vec![0.0]);
}

#[test]
fn parameter_comparisons_are_folded() {
    let (rec, x) = independent(&[1.0]).unwrap();
    let a = Tracked::constant(1.0);
    let b = Tracked::constant(2.0);
    let y = cond_exp_lt(a, b, x[0], x[0] * 5.0);
    let f = rec.freeze(&[y]).unwrap();
    // y is x itself: nothing but the bracket ops and the multiply.
    assert!((0..f.size_op()).all(|i| f.player().op(i) != OpCode::CExp));
}

#[test]
fn max_min_and_atan2() {
    let mut f = record_multi(|x| vec![x[0].max(x[1]), x[0].min(x[1]), x[0].atan2(x[1])], &[1.0, 1.0]).unwrap();
    for &(y, x) in &[(1.0, 2.0), (2.0, 1.0), (1.0, -2.0), (-1.0, -0.5), (-3.0, 1.0)] {
        let out = f.forward(0, &[y, x]).unwrap();
        assert_eq!(out[0], y.max(x));
        assert_eq!(out[1], y.min(x));
        assert_relative_eq!(out[2], y.atan2(x), max_relative = 1e-13);

        let g = f.reverse(0, &[0.0, 0.0, 1.0]).unwrap();
        let r2 = x * x + y * y;
        assert_relative_eq!(g[0], x / r2, max_relative = 1e-12);
        assert_relative_eq!(g[1], -y / r2, max_relative = 1e-12);

        let g = f.reverse(0, &[1.0, 0.0, 0.0]).unwrap();
        let expected = if y < x { [0.0, 1.0] } else { [1.0, 0.0] };
        assert_eq!(g, expected.to_vec());
    }
}

#[test]
fn atan2_at_the_origin_is_zero() {
    let mut f = record(|x| x[0].atan2(x[1]), &[1.0, 1.0]).unwrap();
    assert_eq!(f.forward(0, &[0.0, 0.0]).unwrap(), vec![0.0_f64.atan2(0.0)]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![0.0, 0.0]);

    assert_relative_eq!(f.forward(0, &[2.0, 0.0]).unwrap()[0], std::f64::consts::FRAC_PI_2, max_relative = 1e-15);
    assert_relative_eq!(f.forward(0, &[0.0, -1.0]).unwrap()[0], std::f64::consts::PI, max_relative = 1e-15);

    let (rec, x) = independent(&[0.0, 0.0]).unwrap();
    let y = x[0].atan2(x[1]);
    assert_eq!(y.value(), 0.0);
    let mut g = rec.freeze(&[y]).unwrap();
    assert_eq!(g.forward(0, &[0.0, 0.0]).unwrap(), vec![0.0]);
}

// ══════════════════════════════════════════════
//  2. Compare-change detection
// ══════════════════════════════════════════════

#[test]
fn compare_change_reports_first_changed_comparison() {
    let (rec, x) = independent(&[2.0, 1.0]).unwrap();
    let y = if x[0] > 1.0 { x[0] * 2.0 } else { x[0] * 3.0 };
    let z = if x[1] <= x[0] { y + x[1] } else { y - x[1] };
    let mut f = rec.freeze(&[z]).unwrap();

    let compares: Vec<usize> = (0..f.size_op()).filter(|&i| f.player().op(i).is_compare()).collect();
    assert_eq!(compares.len(), 2);

    f.forward(0, &[3.0, 0.5]).unwrap();
    assert_eq!(f.compare_change_count(), 0);
    assert_eq!(f.compare_change_op_index(), 0);

    // Only the second comparison flips.
    f.forward(0, &[3.0, 4.0]).unwrap();
    assert_eq!(f.compare_change_count(), 1);
    assert_eq!(f.compare_change_op_index(), compares[1]);

    // Both flip; the first one is reported.
    let y = f.forward(0, &[0.5, 4.0]).unwrap();
    assert_eq!(f.compare_change_count(), 2);
    assert_eq!(f.compare_change_op_index(), compares[0]);
    // The recorded path is still the one replayed.
    assert_eq!(y, vec![0.5 * 2.0 + 4.0]);
}

#[test]
fn equality_comparisons_are_recorded() {
    let (rec, x) = independent(&[1.0, 1.0]).unwrap();
    let same = x[0] == x[1];
    assert!(same);
    let mut f = rec.freeze(&[x[0] + x[1]]).unwrap();
    f.forward(0, &[2.0, 2.0]).unwrap();
    assert_eq!(f.compare_change_count(), 0);
    f.forward(0, &[2.0, 3.0]).unwrap();
    assert_eq!(f.compare_change_count(), 1);
}

// ══════════════════════════════════════════════
//  3. VecAD
// ══════════════════════════════════════════════

fn table_lookup() -> Function<f64> {
    let (rec, x) = independent(&[1.0, 5.0]).unwrap();
    let mut v = VecAd::new(vec![10.0, 20.0, 30.0]);
    v.set(Tracked::constant(2.0), x[1]);
    let y = v.get(x[0]);
    assert_eq!(y.value(), 20.0);
    rec.freeze(&[y]).unwrap()
}

#[test]
fn vec_ad_index_is_resolved_on_replay() {
    let mut f = table_lookup();
    assert_eq!(f.forward(0, &[1.0, 5.0]).unwrap(), vec![20.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![0.0, 0.0]);

    // Truncated toward zero: element 2, which holds x1.
    assert_eq!(f.forward(0, &[2.7, 7.0]).unwrap(), vec![7.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![0.0, 1.0]);
    assert_eq!(f.forward(1, &[0.0, 1.0]).unwrap(), vec![1.0]);

    assert_eq!(f.forward(0, &[0.0, 7.0]).unwrap(), vec![10.0]);
}

#[test]
fn vec_ad_index_out_of_range_at_replay() {
    let mut f = table_lookup();
    assert_eq!(
        f.forward(0, &[3.0, 7.0]),
        Err(AdError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(f.size_order(), 0);
    assert!(f.forward(0, &[-1.0, 7.0]).is_err());
    assert_eq!(f.forward(0, &[2.0, 7.0]).unwrap(), vec![7.0]);
}

#[test]
fn vec_ad_stores_with_variable_index() {
    let (rec, x) = independent(&[0.0, 3.0]).unwrap();
    let mut v = VecAd::zeros(2);
    v.set(x[0], x[1] * x[1]);
    let y = v.get(Tracked::constant(0.0)) + v.get(Tracked::constant(1.0));
    assert_eq!(v.values(), &[9.0, 0.0]);
    let mut f = rec.freeze(&[y]).unwrap();

    assert_eq!(f.forward(0, &[1.0, 2.0]).unwrap(), vec![4.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![0.0, 4.0]);
}

#[test]
fn vec_ad_untouched_by_variables_records_nothing() {
    let (rec, x) = independent(&[1.0]).unwrap();
    let mut v = VecAd::new(vec![1.0, 2.0]);
    let c = v.get(Tracked::constant(1.0));
    let f = rec.freeze(&[x[0] * c]).unwrap();
    assert!((0..f.size_op()).all(|i| !matches!(f.player().op(i), OpCode::LdP | OpCode::LdV)));
}

// ══════════════════════════════════════════════
//  4. Atomic functions
// ══════════════════════════════════════════════

/// `y = x^2`, every order.
struct Square;

impl Atomic<f64> for Square {
    fn name(&self) -> &str {
        "square"
    }

    fn forward(&self, _: usize, low: usize, up: usize, tx: &[f64], ty: &mut [f64]) -> Result<(), String> {
        for k in low..=up {
            ty[k] = (0..=k).map(|i| tx[i] * tx[k - i]).sum();
        }
        Ok(())
    }

    fn reverse(
        &self,
        _: usize,
        up: usize,
        tx: &[f64],
        _ty: &[f64],
        px: &mut [f64],
        py: &[f64],
    ) -> Result<(), String> {
        for j in 0..=up {
            for k in 0..=j {
                px[k] += 2.0 * py[j] * tx[j - k];
            }
        }
        Ok(())
    }
}

/// `(y0, y1) = (2 x1, 3 x0)`, first order only.
struct Swap;

impl Atomic<f64> for Swap {
    fn name(&self) -> &str {
        "swap"
    }

    fn for_type(
        &self,
        _: usize,
        arg_types: &[numbat::ArgType],
        result_types: &mut [numbat::ArgType],
    ) -> Result<(), String> {
        result_types[0] = arg_types[1];
        result_types[1] = arg_types[0];
        Ok(())
    }

    fn forward(&self, _: usize, low: usize, up: usize, tx: &[f64], ty: &mut [f64]) -> Result<(), String> {
        if up > 1 {
            return Err(format!("order {up} not supported"));
        }
        let q = up + 1;
        for k in low..=up {
            ty[k] = 2.0 * tx[q + k];
            ty[q + k] = 3.0 * tx[k];
        }
        Ok(())
    }

    fn reverse(
        &self,
        _: usize,
        up: usize,
        _tx: &[f64],
        _ty: &[f64],
        px: &mut [f64],
        py: &[f64],
    ) -> Result<(), String> {
        let q = up + 1;
        for k in 0..q {
            px[q + k] += 2.0 * py[k];
            px[k] += 3.0 * py[q + k];
        }
        Ok(())
    }
}

#[test]
fn atomic_square() {
    let square = AtomicFunction::new(Square);
    let (rec, x) = independent(&[3.0, 2.0]).unwrap();
    let y = square.call_scalar(0, &[x[0]]) * x[1];
    assert_eq!(y.value(), 18.0);
    let mut f = rec.freeze(&[y]).unwrap();
    assert!((0..f.size_op()).any(|i| f.player().op(i) == OpCode::Call));

    assert_eq!(f.forward(0, &[4.0, 0.5]).unwrap(), vec![8.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![4.0, 16.0]);
    assert_eq!(f.forward(1, &[1.0, 0.0]).unwrap(), vec![4.0]);
    assert_eq!(f.forward(2, &[0.0, 0.0]).unwrap(), vec![0.5]);
    // [(H v)_0, g_0, (H v)_1, g_1]
    assert_eq!(f.reverse(1, &[1.0]).unwrap(), vec![1.0, 4.0, 8.0, 16.0]);
}

#[test]
fn atomic_with_parameter_results() {
    let swap = AtomicFunction::new(Swap);
    let (rec, x) = independent(&[2.0]).unwrap();
    let y = swap.call(0, &[x[0], Tracked::constant(5.0)], 2).unwrap();
    assert_eq!((y[0].value(), y[1].value()), (10.0, 6.0));
    assert!(y[0].is_parameter());
    assert!(y[1].is_variable());
    let mut f = rec.freeze(&[y[0] + y[1]]).unwrap();

    assert_eq!(f.forward(0, &[4.0]).unwrap(), vec![22.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![3.0]);
    assert_eq!(f.forward(1, &[1.0]).unwrap(), vec![3.0]);

    let err = f.forward(2, &[0.0]).unwrap_err();
    assert!(matches!(
        err,
        AdError::AtomicFailed { ref name, stage: "forward", .. } if name == "swap"
    ));
}

// ══════════════════════════════════════════════
//  5. Conditional skip on a hand-built tape
// ══════════════════════════════════════════════

/// `exp(x)`, with a print operator that is skipped when `x < 0`.
fn skip_tape() -> Function<f64> {
    let mut rec = Recorder::<f64>::new();
    let x = rec.begin(1).unwrap()[0];
    let zero = rec.put_constant(0.0);
    let before = rec.put_text("x = ");
    let after = rec.put_text(";");
    // [cop, flags (left is a variable), left, right, n_true, n_false, targets..]
    rec.put_op(OpCode::CSkip, &[CompareOp::Lt as u32, 1, x.raw(), zero.raw(), 1, 0, 3])
        .unwrap();
    // [flags (value is a variable), pos, before, value, after]
    rec.put_op(OpCode::Pri, &[2, zero.raw(), before, x.raw(), after]).unwrap();
    let y = rec.put_op(OpCode::Exp, &[x.raw()]).unwrap();
    Function::new(rec.freeze(&[y]).unwrap())
}

#[test]
fn cskip_disables_operators_when_its_comparison_holds() {
    let mut f = skip_tape();
    assert_eq!(f.player().op(3), OpCode::Pri);

    let mut out = Vec::new();
    let y = f.forward_with_writer(0, &[1.0], &mut out).unwrap();
    assert_relative_eq!(y[0], 1.0_f64.exp());
    assert_eq!(String::from_utf8(out).unwrap(), "x = 1;");

    let mut out = Vec::new();
    let y = f.forward_with_writer(0, &[-1.0], &mut out).unwrap();
    assert_relative_eq!(y[0], (-1.0_f64).exp());
    assert!(out.is_empty());
    assert_relative_eq!(f.reverse(0, &[1.0]).unwrap()[0], (-1.0_f64).exp());
}

#[test]
fn cskip_cannot_target_earlier_operators() {
    let mut rec = Recorder::<f64>::new();
    let x = rec.begin(1).unwrap()[0];
    let zero = rec.put_constant(0.0);
    let err = rec
        .put_op(OpCode::CSkip, &[CompareOp::Lt as u32, 1, x.raw(), zero.raw(), 1, 0, 1])
        .unwrap_err();
    assert!(matches!(err, AdError::Internal(_)));
}

// ══════════════════════════════════════════════
//  6. Cumulative sums
// ══════════════════════════════════════════════

#[test]
fn sum_of_records_one_operator() {
    let (rec, x) = independent(&[1.0, 2.0, 4.0]).unwrap();
    let y = Tracked::sum_of(&[x[0], x[1], Tracked::constant(10.0)], &[x[2], Tracked::constant(0.5)]);
    assert_eq!(y.value(), 8.5);
    let mut f = rec.freeze(&[y]).unwrap();
    let sums = (0..f.size_op()).filter(|&i| f.player().op(i) == OpCode::CSum).count();
    assert_eq!(sums, 1);

    assert_eq!(f.forward(0, &[3.0, 3.0, 3.0]).unwrap(), vec![12.5]);
    assert_eq!(f.reverse(0, &[2.0]).unwrap(), vec![2.0, 2.0, -2.0]);
    assert_eq!(f.forward(1, &[1.0, 1.0, 5.0]).unwrap(), vec![-3.0]);
}

#[test]
fn sum_of_parameters_is_a_parameter() {
    let y = Tracked::<f64>::sum_of(&[Tracked::constant(1.0), Tracked::constant(2.0)], &[]);
    assert_eq!(y.value(), 3.0);
    assert!(y.is_parameter());
}

// ══════════════════════════════════════════════
//  7. Print-forward
// ══════════════════════════════════════════════

#[test]
fn print_for_writes_during_zero_order_passes() {
    let (rec, x) = independent(&[1.0]).unwrap();
    let y = x[0] * 2.0;
    print_for(x[0], "y = ", y, "\n");
    let mut f = rec.freeze(&[y]).unwrap();

    let mut out = Vec::new();
    f.forward_with_writer(0, &[-2.0], &mut out).unwrap();
    f.forward_with_writer(1, &[1.0], &mut out).unwrap();
    f.forward_with_writer(0, &[3.0], &mut out).unwrap();
    f.forward_with_writer(0, &[0.0], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "y = -4\ny = 0\n");
}

// ══════════════════════════════════════════════
//  8. Discrete functions
// ══════════════════════════════════════════════

fn step(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

#[test]
fn discrete_functions_are_reevaluated_with_zero_derivative() {
    let heaviside = Discrete::new("step", step);
    let (rec, x) = independent(&[1.0, 3.0]).unwrap();
    let y = heaviside.call(x[0]) * x[1];
    assert_eq!(y.value(), 3.0);
    let mut f = rec.freeze(&[y]).unwrap();

    assert_eq!(f.forward(0, &[-1.0, 5.0]).unwrap(), vec![0.0]);
    assert_eq!(f.forward(0, &[2.0, 5.0]).unwrap(), vec![5.0]);
    assert_eq!(f.reverse(0, &[1.0]).unwrap(), vec![0.0, 1.0]);
    assert_eq!(f.forward(1, &[1.0, 0.0]).unwrap(), vec![0.0]);
}

#[test]
fn rounding_and_remainder() {
    let mut f = record_multi(|x| vec![x[0].floor(), x[0].ceil(), x[0] % 2.0, x[0].fract()], &[3.5]).unwrap();
    assert_eq!(f.forward(0, &[5.25]).unwrap(), vec![5.0, 6.0, 1.25, 0.25]);
    assert_eq!(f.forward(1, &[1.0]).unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
}

// ══════════════════════════════════════════════
//  9. Dependents and the function object
// ══════════════════════════════════════════════

#[test]
fn parameter_and_independent_dependents() {
    let mut f = record_multi(|x| vec![x[0] * 2.0, Tracked::constant(7.0), x[0]], &[1.0]).unwrap();
    assert_eq!(f.range(), 3);
    assert!((0..f.size_op()).any(|i| f.player().op(i) == OpCode::Par));

    assert_eq!(f.forward(0, &[3.0]).unwrap(), vec![6.0, 7.0, 3.0]);
    assert_eq!(f.forward(1, &[1.0]).unwrap(), vec![2.0, 0.0, 1.0]);
    assert_eq!(f.reverse(0, &[0.0, 1.0, 0.0]).unwrap(), vec![0.0]);
    assert_eq!(f.reverse(0, &[1.0, 1.0, 1.0]).unwrap(), vec![3.0]);
}

#[test]
fn sizes_and_capacity() {
    let mut f = record(|x| x[0].sin() * x[1], &[0.5, 2.0]).unwrap();
    assert_eq!(f.domain(), 2);
    assert_eq!(f.range(), 1);
    // phantom, two independents, cos/sin pair, product
    assert_eq!(f.size_var(), 6);
    assert_eq!(f.size_op(), 6);

    f.forward(2, &[0.5, 1.0, 0.0, 2.0, 0.0, 0.0]).unwrap();
    assert_eq!(f.size_order(), 3);
    f.capacity_order(1);
    assert_eq!(f.size_order(), 1);
    assert!(f.reverse(1, &[1.0]).is_err());
    let g = f.reverse(0, &[1.0]).unwrap();
    assert_relative_eq!(g[0], 2.0 * 0.5_f64.cos(), max_relative = 1e-15);
    assert_relative_eq!(f.forward(1, &[1.0, 0.0]).unwrap()[0], 2.0 * 0.5_f64.cos(), max_relative = 1e-15);
}

#[test]
fn replace_player_resets_the_taylor_state() {
    let mut f = record(|x| x[0] * x[0], &[1.0]).unwrap();
    f.forward(0, &[3.0]).unwrap();
    let g = record(|x| x[0] * x[0] * x[0], &[1.0]).unwrap();

    f.replace_player(g.into_player());
    assert_eq!(f.size_order(), 0);
    assert_eq!(f.forward(0, &[2.0]).unwrap(), vec![8.0]);
}

#[test]
fn player_round_trips_through_its_parts() {
    let f = record(|x| x[0].tanh() + x[1], &[0.5, 1.0]).unwrap();
    let listing = f.player().to_string();
    assert!(listing.contains("Tanh"));
    assert!(listing.contains("Addvv"));

    let rebuilt = numbat::Player::new(f.into_player().into_parts()).unwrap();
    let mut f = Function::new(rebuilt);
    assert_relative_eq!(f.forward(0, &[0.5, 1.0]).unwrap()[0], 0.5_f64.tanh() + 1.0);
}

#[test]
fn tracing_does_not_change_results() {
    let mut f = record(|x| x[0].exp() * x[1], &[0.0, 1.0]).unwrap();
    let quiet = f.forward(0, &[0.3, 2.0]).unwrap();
    f.set_trace(true);
    assert_eq!(f.forward(0, &[0.3, 2.0]).unwrap(), quiet);
    assert_eq!(f.reverse(0, &[1.0]).unwrap().len(), 2);
}
