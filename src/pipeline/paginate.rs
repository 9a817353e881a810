//! Grid pagination: the front/back imposition of card pairs.
//!
//! ## The alignment problem
//!
//! A sheet printed duplex with a long-edge flip shows its back side mirrored
//! left-to-right relative to the front. For the back of a card to land behind
//! its own front after cutting, the back page must place each card in the
//! horizontally mirrored column of the same row:
//!
//! ```text
//!   front page (not mirrored)      back page (mirrored)
//!   ┌──────┬──────┐                ┌──────┬──────┐
//!   │  0   │  1   │                │  1   │  0   │
//!   ├──────┼──────┤                ├──────┼──────┤
//!   │  2   │  3   │                │  3   │  2   │
//!   ├──────┼──────┤                ├──────┼──────┤
//!   │  4   │      │                │      │  4   │
//!   └──────┴──────┘                └──────┴──────┘
//! ```
//!
//! Each image is also turned so the card's long edge runs along the sheet's
//! long edge; the back turns the opposite way to the front so both faces of a
//! card end up the same way up after the flip.
//!
//! Pagination is pure: no I/O, no pixel work. Rotation is recorded on each
//! [`Placement`] and applied when the page is emitted.

use crate::config::{LayoutConfig, SidePolicy};
use crate::model::{CardPair, PageDescription, PageKind, Placement};
use std::sync::Arc;

/// Partition `cards` into groups of `layout.cards_per_page` and lay out one
/// front page followed by one back page per group.
///
/// Returns an empty list for empty input.
pub fn paginate(cards: &[CardPair], layout: &LayoutConfig) -> Vec<PageDescription> {
    let per_page = layout.cards_per_page.max(1);

    cards
        .chunks(per_page)
        .enumerate()
        .flat_map(|(group, chunk)| {
            let first_card = group * per_page;
            [
                layout_side(PageKind::Front, group, first_card, chunk, layout),
                layout_side(PageKind::Back, group, first_card, chunk, layout),
            ]
        })
        .collect()
}

fn layout_side(
    kind: PageKind,
    group: usize,
    first_card: usize,
    chunk: &[CardPair],
    layout: &LayoutConfig,
) -> PageDescription {
    let columns = layout.columns.max(1);
    let (policy, margins) = match kind {
        PageKind::Front => (layout.front, layout.front_margins),
        PageKind::Back => (layout.back, layout.back_margins),
    };

    let placements = chunk
        .iter()
        .enumerate()
        .map(|(slot, pair)| {
            let (row, column) = cell_for(slot, columns, policy);
            let image = match kind {
                PageKind::Front => Arc::clone(&pair.front),
                PageKind::Back => Arc::clone(&pair.back),
            };
            Placement {
                card_index: first_card + slot,
                image,
                rotation: policy.rotation,
                row,
                column,
            }
        })
        .collect();

    PageDescription {
        kind,
        group,
        margins,
        rows: layout.rows_for(chunk.len()),
        columns,
        column_width_cm: layout.column_width_cm(),
        image_height_cm: layout.card_height_cm,
        placements,
    }
}

/// Grid cell of the `slot`-th card in a group: row-major, with the column
/// order reversed when the side is mirrored.
fn cell_for(slot: usize, columns: usize, policy: SidePolicy) -> (usize, usize) {
    let row = slot / columns;
    let within_row = slot % columns;
    let column = if policy.mirror_columns {
        columns - 1 - within_row
    } else {
        within_row
    };
    (row, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarginSet, Rotation};
    use crate::model::RasterImage;

    fn pairs(n: usize) -> Vec<CardPair> {
        (0..n)
            .map(|i| {
                CardPair::new(
                    format!("card{i}.pdf"),
                    RasterImage::filled(30, 20, [i as u8, 0, 0]),
                    RasterImage::filled(30, 20, [0, i as u8, 0]),
                )
            })
            .collect()
    }

    fn layout(per_page: usize) -> LayoutConfig {
        LayoutConfig::builder().cards_per_page(per_page).build().unwrap()
    }

    #[test]
    fn empty_input_yields_no_pages() {
        assert!(paginate(&[], &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn front_then_back_per_group() {
        let pages = paginate(&pairs(10), &layout(4));
        let kinds: Vec<_> = pages.iter().map(|p| (p.group, p.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, PageKind::Front),
                (0, PageKind::Back),
                (1, PageKind::Front),
                (1, PageKind::Back),
                (2, PageKind::Front),
                (2, PageKind::Back),
            ]
        );
    }

    #[test]
    fn rows_follow_layout_for_every_group_size() {
        let layout = LayoutConfig::builder()
            .cards_per_page(7)
            .columns(3)
            .build()
            .unwrap();
        let pages = paginate(&pairs(10), &layout);
        assert_eq!(pages.len(), 4);
        for page in &pages {
            assert_eq!(page.rows, layout.rows_for(page.placements.len()));
        }
        assert_eq!(pages[0].rows, 3);
        assert_eq!(pages[2].rows, 1);
    }

    #[test]
    fn last_group_holds_remainder() {
        let pages = paginate(&pairs(10), &layout(4));
        assert_eq!(pages[4].placements.len(), 2);
        assert_eq!(pages[5].placements.len(), 2);
        assert_eq!(pages[4].rows, 1);

        let exact = paginate(&pairs(8), &layout(4));
        assert_eq!(exact.len(), 4);
        assert!(exact.iter().all(|p| p.placements.len() == 4));
    }

    #[test]
    fn front_fills_left_to_right_back_right_to_left() {
        let pages = paginate(&pairs(3), &layout(8));
        let front: Vec<_> = pages[0]
            .placements
            .iter()
            .map(|p| (p.card_index, p.row, p.column))
            .collect();
        let back: Vec<_> = pages[1]
            .placements
            .iter()
            .map(|p| (p.card_index, p.row, p.column))
            .collect();
        assert_eq!(front, vec![(0, 0, 0), (1, 0, 1), (2, 1, 0)]);
        assert_eq!(back, vec![(0, 0, 1), (1, 0, 0), (2, 1, 1)]);
    }

    #[test]
    fn placements_use_the_right_face() {
        let cards = pairs(2);
        let pages = paginate(&cards, &layout(8));
        assert!(Arc::ptr_eq(&pages[0].placements[1].image, &cards[1].front));
        assert!(Arc::ptr_eq(&pages[1].placements[1].image, &cards[1].back));
    }

    #[test]
    fn rotation_follows_side_policy() {
        let pages = paginate(&pairs(5), &layout(2));
        for page in &pages {
            let expected = match page.kind {
                PageKind::Front => Rotation::Cw90,
                PageKind::Back => Rotation::Cw270,
            };
            assert!(page.placements.iter().all(|p| p.rotation == expected));
        }
    }

    #[test]
    fn custom_policy_is_honoured() {
        let l = LayoutConfig::builder()
            .front_policy(SidePolicy {
                rotation: Rotation::None,
                mirror_columns: true,
            })
            .build()
            .unwrap();
        let pages = paginate(&pairs(1), &l);
        assert_eq!(pages[0].placements[0].rotation, Rotation::None);
        assert_eq!(pages[0].placements[0].column, 1);
    }

    #[test]
    fn three_columns_mirror() {
        let l = LayoutConfig::builder().columns(3).build().unwrap();
        let pages = paginate(&pairs(4), &l);
        assert_eq!(pages[0].rows, 2);
        assert_eq!(pages[1].card_at(0, 2), Some(0));
        assert_eq!(pages[1].card_at(0, 0), Some(2));
        assert_eq!(pages[1].card_at(1, 2), Some(3));
    }

    #[test]
    fn margins_follow_page_kind() {
        let l = LayoutConfig::builder()
            .front_margins(MarginSet::uniform(2.0))
            .back_margins(MarginSet::new(1.0, 1.0, 0.5, 1.0))
            .build()
            .unwrap();
        let pages = paginate(&pairs(1), &l);
        assert_eq!(pages[0].margins, MarginSet::uniform(2.0));
        assert_eq!(pages[1].margins, MarginSet::new(1.0, 1.0, 0.5, 1.0));
    }

    #[test]
    fn geometry_is_fixed_per_layout() {
        let pages = paginate(&pairs(8), &LayoutConfig::default());
        for page in &pages {
            assert_eq!(page.rows, 4);
            assert_eq!(page.columns, 2);
            assert!((page.column_width_cm - 9.7).abs() < 1e-9);
            assert_eq!(page.image_height_cm, 5.81);
        }
    }
}
