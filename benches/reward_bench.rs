use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gobench::parse::{extract_move, parse_response};
use gobench::{score, Candidate, GroundTruth};

fn sample_response() -> String {
    let reasoning = "黑棋右下角尚空，Q4 占角同时限制白棋发展。".repeat(40);
    format!(
        "<reasoning>{reasoning}</reasoning>\n<answer>\n\\boxed{{下一步颜色:黑}}\n\\boxed{{下一步位置:Q4}}\n\\boxed{{下一步胜率:61.5%}}\n</answer>"
    )
}

fn sample_truth() -> GroundTruth {
    let candidates = ["Q4", "R4", "C16", "D17", "R3", "P4", "C3", "K10"]
        .iter()
        .enumerate()
        .map(|(i, mv)| Candidate { mv: mv.to_string(), win_rate: 0.62 - 0.03 * i as f64, score_lead: 2.0 - i as f64 })
        .collect();
    GroundTruth { former_moves: vec!["Q16".into(), "D4".into()], candidates }
}

fn bench_reward(c: &mut Criterion) {
    let text = sample_response();
    let truth = sample_truth();
    c.bench_function("parse_response", |b| b.iter(|| black_box(parse_response(black_box(&text)))));
    c.bench_function("extract_move", |b| b.iter(|| black_box(extract_move(black_box(&text)))));
    c.bench_function("score", |b| b.iter(|| black_box(score(black_box(&text), black_box(&truth)))));
}

criterion_group!(benches, bench_reward);
criterion_main!(benches);
