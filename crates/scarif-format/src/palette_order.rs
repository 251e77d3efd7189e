use scarif_common::Result;
use scarif_world::PalettedContainer;

/// Rewrites a container so its palette runs from most to least used. Ties keep their
/// original order and unused entries are dropped, so equal content always yields the
/// same palette and indices. A container left with one entry loses its index array.
pub fn reorder_by_frequency<T: Clone>(container: &PalettedContainer<T>) -> Result<PalettedContainer<T>> {
    let palette = container.palette();
    let indices = match container.indices() {
        Some(indices) => indices,
        None => return PalettedContainer::new(palette.to_vec(), None),
    };

    let mut counts = vec![0usize; palette.len()];
    for &index in indices {
        counts[index as usize] += 1;
    }

    let mut order: Vec<usize> = (0..palette.len()).filter(|&i| counts[i] > 0).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));

    let mut remap = vec![0u16; palette.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = new as u16;
    }

    let reordered: Vec<T> = order.iter().map(|&old| palette[old].clone()).collect();
    if reordered.len() < 2 {
        return PalettedContainer::new(reordered, None);
    }
    let indices = indices.iter().map(|&i| remap[i as usize]).collect();
    PalettedContainer::new(reordered, Some(indices))
}
