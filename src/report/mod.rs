//! Reporting utilities: rankings and formatted terminal output.

pub mod format;

pub use format::*;

use crate::sim::EnergyLedger;

/// One entry of the lowest-yield ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakCell {
    pub cell: usize,
    pub energy_wh: f64,
}

/// The `top_n` cells that produced the least energy (ties by lower index).
pub fn rank_weakest_cells(ledger: &EnergyLedger, top_n: usize) -> Vec<WeakCell> {
    let mut cells: Vec<WeakCell> = ledger
        .per_cell_wh
        .iter()
        .enumerate()
        .map(|(cell, &energy_wh)| WeakCell { cell, energy_wh })
        .collect();
    cells.sort_by(|a, b| {
        a.energy_wh
            .partial_cmp(&b.energy_wh)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cell.cmp(&b.cell))
    });
    cells.truncate(top_n);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weakest_cells_come_first() {
        let mut ledger = EnergyLedger::new(1, 4);
        ledger.per_cell_wh = vec![5.0, 1.0, 3.0, 1.0];
        let ranked = rank_weakest_cells(&ledger, 3);
        let ids: Vec<usize> = ranked.iter().map(|w| w.cell).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert!(rank_weakest_cells(&ledger, 0).is_empty());
    }
}
