//! Timestamp alignment of two price series.

use serde::Serialize;
use statarb_core::PriceSeries;

/// Two legs joined on exact timestamp, ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignedFrame {
    pub timestamps: Vec<i64>,
    pub price_a: Vec<f64>,
    pub price_b: Vec<f64>,
}

impl AlignedFrame {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn push(&mut self, timestamp_ms: i64, a: f64, b: f64) {
        self.timestamps.push(timestamp_ms);
        self.price_a.push(a);
        self.price_b.push(b);
    }
}

/// Inner join on exact timestamp.
///
/// Both series are sorted by timestamp. Runs of equal timestamps join as a
/// cross product, in arrival order within each run.
pub fn align(a: &PriceSeries, b: &PriceSeries) -> AlignedFrame {
    let (pa, pb) = (a.points(), b.points());
    let mut frame = AlignedFrame::default();
    let (mut i, mut j) = (0, 0);

    while i < pa.len() && j < pb.len() {
        let (ta, tb) = (pa[i].timestamp_ms, pb[j].timestamp_ms);
        if ta < tb {
            i += 1;
        } else if tb < ta {
            j += 1;
        } else {
            let run_a = pa[i..].iter().take_while(|p| p.timestamp_ms == ta).count();
            let run_b = pb[j..].iter().take_while(|p| p.timestamp_ms == ta).count();
            for left in &pa[i..i + run_a] {
                for right in &pb[j..j + run_b] {
                    frame.push(ta, left.price, right.price);
                }
            }
            i += run_a;
            j += run_b;
        }
    }

    frame
}
