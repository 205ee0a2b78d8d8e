//! Small catalog shared by the unit tests.
//!
//! | line     | kind        | prices                         | notes                                   |
//! |----------|-------------|--------------------------------|-----------------------------------------|
//! | X        | dimensioned | 80×190 = 500                   | models m10/m12, two colors, RAL, bitono |
//! | LUXE     | dimensioned | 70..100 × 120 = 220/250/280/310 | single model, no colors, grille table  |
//! | STRUCT   | dimensioned | 80×120 = 400                   | frame-count discount                    |
//! | KITS     | kit         | sifon 35, tapa 60              |                                         |
//! | ENCIMERA | countertop  | 50×100 = 300                   |                                         |
//! | CUSTOM   | custom      |                                |                                         |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{
    Catalog, ColorOption, GrilleSurcharge, KitProduct, LineKind, PriceTable,
    PrivilegedDiscountConfig, ProductLine, ProductOption, WidthSurcharge,
};

pub(crate) fn option(
    id: &str,
    price: Decimal,
) -> ProductOption {
    ProductOption {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        price,
        price_factor: None,
    }
}

fn model(
    id: &str,
    factor: Decimal,
) -> ProductOption {
    ProductOption {
        price_factor: Some(factor),
        ..option(id, Decimal::ZERO)
    }
}

fn color(
    id: &str,
    price: Decimal,
) -> ColorOption {
    ColorOption {
        id: id.to_string(),
        name: id.to_string(),
        hex: "#FFFFFF".to_string(),
        price,
    }
}

fn empty_line(
    id: &str,
    kind: LineKind,
) -> ProductLine {
    ProductLine {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        kind,
        widths: vec![],
        lengths: vec![],
        default_width: None,
        default_length: None,
        models: vec![],
        colors: vec![],
        extras: vec![],
        default_extras: vec![],
        exclusive_extra_groups: vec![],
        kits: vec![],
        grille_surcharge: None,
        frame_discount: false,
    }
}

pub(crate) fn catalog() -> Catalog {
    let x = ProductLine {
        widths: vec![80, 90],
        lengths: vec![190],
        models: vec![model("m10", dec!(1.0)), model("m12", dec!(1.2))],
        colors: vec![color("blanco", dec!(20)), color("antracita", dec!(35))],
        extras: vec![
            option("valvula", dec!(30)),
            option("ral", dec!(60)),
            option("bitono", dec!(45)),
            option("rejilla-inox", dec!(25)),
            option("rejilla-negra", dec!(28)),
        ],
        exclusive_extra_groups: vec![vec![
            "rejilla-inox".to_string(),
            "rejilla-negra".to_string(),
        ]],
        ..empty_line("X", LineKind::Dimensioned)
    };

    let luxe = ProductLine {
        widths: vec![70, 80, 90, 100],
        lengths: vec![120],
        default_width: Some(80),
        default_length: Some(120),
        models: vec![option("luxe", Decimal::ZERO)],
        extras: vec![option("tapeta", dec!(0)), option("rejilla", dec!(50))],
        default_extras: vec!["tapeta".to_string()],
        exclusive_extra_groups: vec![vec!["tapeta".to_string(), "rejilla".to_string()]],
        grille_surcharge: Some(GrilleSurcharge {
            extra_ids: vec!["rejilla".to_string()],
            by_width: [(70, dec!(86)), (80, dec!(90)), (90, dec!(94)), (100, dec!(98))]
                .into_iter()
                .map(|(width, price)| WidthSurcharge { width, price })
                .collect(),
        }),
        ..empty_line("LUXE", LineKind::Dimensioned)
    };

    let structural = ProductLine {
        widths: vec![80],
        lengths: vec![120],
        models: vec![model("estandar", dec!(1)), model("reforzado", dec!(1.5))],
        frame_discount: true,
        ..empty_line("STRUCT", LineKind::Dimensioned)
    };

    let kits = ProductLine {
        kits: vec![
            KitProduct {
                id: "sifon".to_string(),
                name: "Sifón".to_string(),
                description: String::new(),
                price: dec!(35),
            },
            KitProduct {
                id: "tapa".to_string(),
                name: "Tapa".to_string(),
                description: String::new(),
                price: dec!(60),
            },
        ],
        ..empty_line("KITS", LineKind::Kit)
    };

    let countertop = ProductLine {
        widths: vec![50],
        lengths: vec![100],
        colors: vec![color("blanco", dec!(20))],
        ..empty_line("ENCIMERA", LineKind::Countertop)
    };

    let mut table = PriceTable::new();
    table.insert("X", 80, 190, dec!(500));
    for (width, price) in [(70, dec!(220)), (80, dec!(250)), (90, dec!(280)), (100, dec!(310))] {
        table.insert("LUXE", width, 120, price);
    }
    table.insert("STRUCT", 80, 120, dec!(400));
    table.insert("ENCIMERA", 50, 100, dec!(300));

    Catalog::new(
        vec![
            x,
            luxe,
            structural,
            kits,
            countertop,
            empty_line("CUSTOM", LineKind::Custom),
        ],
        table,
        PrivilegedDiscountConfig::default(),
    )
}
