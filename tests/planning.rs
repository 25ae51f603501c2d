use unmosaic::image::Mask;
use unmosaic::planner::{plan, MemoryBudget, Plan, PlanRequest, scaled_dims};
use unmosaic::tiles::schedule;

fn request(width: usize, height: usize, allow_downscale: bool) -> PlanRequest {
    PlanRequest {
        width,
        height,
        channels: 3,
        allow_downscale,
        max_resolution: None,
        overlap: 32,
    }
}

#[test]
fn exact_budget_boundary_stays_native() {
    // 4000 * 3000 * 3 * 4 * 1.5 = 216_000_000 bytes, equal to the budget
    let budget = MemoryBudget::new(216_000_000, 4.0, 1.5);
    assert_eq!(plan(&request(4000, 3000, true), &budget).unwrap(), Plan::Native);

    // one byte less and native no longer fits
    let tight = MemoryBudget::new(215_999_999, 4.0, 1.5);
    assert_ne!(plan(&request(4000, 3000, true), &tight).unwrap(), Plan::Native);
}

#[test]
fn over_budget_without_downscale_tiles_within_the_budget() {
    let budget = MemoryBudget::new(100_000_000, 4.0, 1.5);
    let req = request(8000, 8000, false);
    match plan(&req, &budget).unwrap() {
        Plan::Tiled {
            cols,
            rows,
            overlap,
        } => {
            let tw = (8000usize.div_ceil(cols) + 2 * overlap).min(8000);
            let th = (8000usize.div_ceil(rows) + 2 * overlap).min(8000);
            assert!(
                budget.estimated_peak(tw, th, 3) <= budget.available,
                "per-tile peak exceeds the budget for a {cols}x{rows} grid"
            );
        }
        other => panic!("expected a tiled plan, got {other:?}"),
    }
}

#[test]
fn no_plan_ever_exceeds_its_budget() {
    let dims = [(640, 480), (1920, 1080), (4000, 3000), (8192, 8192), (123, 4567)];
    let budgets = [5_000_000u64, 50_000_000, 500_000_000, 5_000_000_000];

    for &(w, h) in &dims {
        for &bytes in &budgets {
            for allow_downscale in [false, true] {
                let budget = MemoryBudget::new(bytes, 4.0, 1.5);
                let req = request(w, h, allow_downscale);
                let planned = match plan(&req, &budget) {
                    Ok(p) => p,
                    // tiny budgets may legitimately be unplannable
                    Err(_) => continue,
                };
                let peak = match planned {
                    Plan::Native => budget.estimated_peak(w, h, 3),
                    Plan::Downscale { factor } => {
                        let (sw, sh) = scaled_dims(w, h, factor as f64);
                        budget.estimated_peak(sw, sh, 3)
                    }
                    Plan::Tiled {
                        cols,
                        rows,
                        overlap,
                    } => {
                        let tw = (w.div_ceil(cols) + 2 * overlap).min(w);
                        let th = (h.div_ceil(rows) + 2 * overlap).min(h);
                        budget.estimated_peak(tw, th, 3)
                    }
                };
                assert!(
                    peak <= budget.available,
                    "{w}x{h} with {bytes} bytes: {planned:?} peaks at {peak}"
                );
            }
        }
    }
}

#[test]
fn planned_grids_schedule_into_an_exact_cover() {
    let budget = MemoryBudget::new(20_000_000, 4.0, 1.5);
    for &(w, h) in &[(3000, 2000), (1531, 977), (4096, 1024)] {
        let req = request(w, h, false);
        if let Ok(Plan::Tiled {
            cols,
            rows,
            overlap,
        }) = plan(&req, &budget)
        {
            let mask = Mask::new(w, h);
            let tiles = schedule(w, h, cols, rows, overlap, &mask);
            let mut cover = vec![0u8; w * h];
            for tile in &tiles {
                for y in tile.interior.y..tile.interior.bottom() {
                    let row = &mut cover[y * w..y * w + w];
                    for c in row
                        .iter_mut()
                        .take(tile.interior.right())
                        .skip(tile.interior.x)
                    {
                        *c += 1;
                    }
                }
            }
            assert!(
                cover.iter().all(|&c| c == 1),
                "{w}x{h} as {cols}x{rows}: interiors must cover each pixel exactly once"
            );
        } else {
            panic!("expected a tiled plan for {w}x{h}");
        }
    }
}

#[test]
fn downscale_plans_respect_budget_and_resolution_cap() {
    let budget = MemoryBudget::new(30_000_000, 4.0, 1.5);
    let req = PlanRequest {
        max_resolution: Some(1600),
        ..request(6000, 4000, true)
    };
    match plan(&req, &budget).unwrap() {
        Plan::Downscale { factor } => {
            let (sw, sh) = scaled_dims(6000, 4000, factor as f64);
            assert!(sw.max(sh) <= 1600, "cap violated: {sw}x{sh}");
            assert!(budget.estimated_peak(sw, sh, 3) <= budget.available);
        }
        other => panic!("expected a downscale plan, got {other:?}"),
    }
}
