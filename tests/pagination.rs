//! Alignment properties of the grid paginator, checked through the public API.
//!
//! These need neither pdfium nor a PDF backend.

use cardsheet::{
    paginate, CardPair, LayoutConfig, MarginSet, PageDescription, PageKind, RasterImage, Rotation,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn cards(n: usize) -> Vec<CardPair> {
    (0..n)
        .map(|i| {
            let shade = (i % 251) as u8;
            CardPair::new(
                format!("card-{i}.pdf"),
                RasterImage::filled(92, 58, [shade, 0, 0]),
                RasterImage::filled(92, 58, [0, 0, shade]),
            )
        })
        .collect()
}

fn layout(cards_per_page: usize, columns: usize) -> LayoutConfig {
    LayoutConfig::builder()
        .cards_per_page(cards_per_page)
        .columns(columns)
        .build()
        .expect("valid layout")
}

fn indices(page: &PageDescription) -> Vec<usize> {
    page.placements.iter().map(|p| p.card_index).collect()
}

// ── Grouping ─────────────────────────────────────────────────────────────────

#[test]
fn group_count_and_sizes() {
    for k in 1..=9 {
        for n in 0..=25 {
            let pages = paginate(&cards(n), &layout(k, 2));
            let groups = n.div_ceil(k);
            assert_eq!(pages.len(), groups * 2, "n={n} k={k}");

            for (g, pair) in pages.chunks(2).enumerate() {
                assert_eq!(pair[0].kind, PageKind::Front);
                assert_eq!(pair[1].kind, PageKind::Back);
                assert_eq!(pair[0].group, g);
                assert_eq!(pair[1].group, g);

                let expected = if g + 1 < groups || n % k == 0 { k } else { n % k };
                assert_eq!(pair[0].placements.len(), expected, "n={n} k={k} g={g}");
                assert_eq!(pair[1].placements.len(), expected, "n={n} k={k} g={g}");
            }
        }
    }
}

#[test]
fn empty_input_produces_nothing() {
    assert!(paginate(&[], &LayoutConfig::default()).is_empty());
}

// ── Order preservation ───────────────────────────────────────────────────────

#[test]
fn every_card_lands_in_its_group_on_both_sides() {
    let k = 8;
    let n = 19;
    let pages = paginate(&cards(n), &layout(k, 2));

    for i in 0..n {
        let group = i / k;
        let position = i % k;
        let front = &pages[group * 2];
        let back = &pages[group * 2 + 1];
        assert_eq!(front.placements[position].card_index, i);
        assert_eq!(back.placements[position].card_index, i);
    }
}

#[test]
fn fronts_and_backs_use_their_own_images() {
    let input = cards(3);
    let pages = paginate(&input, &LayoutConfig::default());
    for (i, card) in input.iter().enumerate() {
        assert_eq!(*pages[0].placements[i].image, *card.front);
        assert_eq!(*pages[1].placements[i].image, *card.back);
    }
}

// ── Mirror / fold ────────────────────────────────────────────────────────────

#[test]
fn back_columns_mirror_front_columns() {
    let columns = 2;
    for m in 1..=4 {
        let pages = paginate(&cards(m), &layout(8, columns));
        let (front, back) = (&pages[0], &pages[1]);

        for row in 0..front.rows {
            for c in 0..columns {
                assert_eq!(
                    front.card_at(row, c),
                    back.card_at(row, columns - 1 - c),
                    "m={m} row={row} column={c}"
                );
            }
        }
    }
}

#[test]
fn mirrored_back_matches_front_cell_by_cell() {
    // Folding the back page over its vertical axis must put every card on
    // top of its own front.
    let pages = paginate(&cards(7), &layout(8, 3));
    let (front, back) = (&pages[0], &pages[1]);
    for f in &front.placements {
        let b = back
            .placements
            .iter()
            .find(|b| b.card_index == f.card_index)
            .expect("card present on back");
        assert_eq!(b.row, f.row);
        assert_eq!(b.column, back.columns - 1 - f.column);
    }
}

#[test]
fn single_card_sits_top_left_front_top_right_back() {
    let pages = paginate(&cards(1), &LayoutConfig::default());
    assert_eq!(pages[0].card_at(0, 0), Some(0));
    assert_eq!(pages[1].card_at(0, 1), Some(0));
    assert_eq!(indices(&pages[1]), vec![0]);
}

// ── Rotation ─────────────────────────────────────────────────────────────────

#[test]
fn fronts_turn_90_backs_turn_270() {
    let mut input = cards(5);
    // Image size must not matter.
    input.push(CardPair::new(
        "square.pdf",
        RasterImage::filled(10, 10, [9, 9, 9]),
        RasterImage::filled(300, 20, [9, 9, 9]),
    ));
    for page in paginate(&input, &layout(4, 2)) {
        let expected = match page.kind {
            PageKind::Front => Rotation::Cw90,
            PageKind::Back => Rotation::Cw270,
        };
        for p in &page.placements {
            assert_eq!(p.rotation, expected);
            assert_eq!(p.rotation.degrees(), if page.kind == PageKind::Front { 90 } else { 270 });
        }
    }
}

#[test]
fn back_is_front_turned_half_way() {
    let l = LayoutConfig::default();
    let diff = (l.back.rotation.degrees() + 360 - l.front.rotation.degrees()) % 360;
    assert_eq!(diff, 180);
}

// ── Margin independence ──────────────────────────────────────────────────────

#[test]
fn changing_front_margins_leaves_back_pages_alone() {
    let input = cards(11);
    let base = paginate(&input, &LayoutConfig::default());
    let changed = paginate(
        &input,
        &LayoutConfig::builder()
            .front_margins(MarginSet::new(3.0, 0.2, 2.2, 0.0))
            .build()
            .unwrap(),
    );

    for (a, b) in base.iter().zip(&changed) {
        if a.kind == PageKind::Back {
            assert_eq!(a.margins, b.margins);
            assert_eq!((a.rows, a.columns), (b.rows, b.columns));
            assert_eq!(a.column_width_cm, b.column_width_cm);
            assert_eq!(indices(a), indices(b));
        } else {
            assert_eq!(b.margins, MarginSet::new(3.0, 0.2, 2.2, 0.0));
        }
    }
}

#[test]
fn changing_back_margins_leaves_front_pages_alone() {
    let input = cards(4);
    let base = paginate(&input, &LayoutConfig::default());
    let changed = paginate(
        &input,
        &LayoutConfig::builder()
            .back_margins(MarginSet::uniform(0.3))
            .build()
            .unwrap(),
    );
    for (a, b) in base.iter().zip(&changed) {
        if a.kind == PageKind::Front {
            assert_eq!(a.margins, b.margins);
            assert_eq!(indices(a), indices(b));
        }
    }
}

// ── Geometry ─────────────────────────────────────────────────────────────────

#[test]
fn reference_card_geometry() {
    let l = LayoutConfig::builder()
        .card_size(5.81, 9.2)
        .cards_per_page(8)
        .columns(2)
        .build()
        .unwrap();
    for page in paginate(&cards(8), &l) {
        assert_eq!(page.rows, 4);
        assert!((page.column_width_cm - 9.7).abs() < 1e-9);
        assert_eq!(page.image_height_cm, 5.81);
    }
}

#[test]
fn column_width_ignores_margins() {
    let l = LayoutConfig::builder()
        .front_margins(MarginSet::uniform(4.0))
        .back_margins(MarginSet::uniform(0.0))
        .build()
        .unwrap();
    let pages = paginate(&cards(2), &l);
    assert_eq!(pages[0].column_width_cm, pages[1].column_width_cm);
    assert!((pages[0].column_width_cm - 9.7).abs() < 1e-9);
}
