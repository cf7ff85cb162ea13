//! Integration test for "Cache prune under use": a stem referenced by a
//! live riff survives a `prune(0)` call; once the riff is dropped, the
//! next prune evicts it.

use riffwork_cache::StemCache;
use riffwork_core::{Riff, RiffId, Stem, StemId};

fn make_stem(id: StemId, samples: usize) -> Stem {
    Stem::new(id, 44100, 120.0, vec![0.0; samples], vec![0.0; samples])
}

#[test]
fn stem_survives_prune_while_riff_holds_it_then_is_evicted() {
    let cache = StemCache::new();
    let stem_id = StemId::from_str_lossy("stem-under-use");

    let stem = cache.get_or_insert(&stem_id, || Some(make_stem(stem_id, 2000)));

    let riff_a = Riff::new(RiffId::from_str_lossy("riff-a"), 120.0, 4, 4, 4000, 44100, 0)
        .with_stem(0, Some(stem), 1.0, 1.0, 1);

    cache.prune(0);
    assert_eq!(cache.len(), 1, "riff_a still holds the stem, so prune must park it");

    drop(riff_a);
    cache.prune(0);
    assert_eq!(cache.len(), 0, "with no riff referencing it, prune now evicts the stem");
}
