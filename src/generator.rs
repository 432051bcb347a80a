use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use fake::{
    faker::{
        address::en::{BuildingNumber, CityName, StreetName, ZipCode},
        internet::en::{SafeEmail, IPv4},
        name::en::Name,
        phone_number::en::PhoneNumber,
    },
    Fake,
};
use log::info;
use rand::Rng;
use serde::Serialize;

use std::{
    fs,
    path::{Path, PathBuf},
};

/// One synthetic purchase, in the column order of the purchase CSV files.
#[derive(Debug, Serialize)]
pub struct Purchase {
    #[serde(rename = "id_transaccion")]
    pub id: u32,
    #[serde(rename = "fecha_emision")]
    pub issued_on: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "ciudad")]
    pub city: String,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    pub ip: String,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "monto_total")]
    pub total: u32,
    #[serde(rename = "modalidad_pago")]
    pub payment_mode: &'static str,
    #[serde(rename = "estado_pago")]
    pub payment_status: &'static str,
    pub timestamp: String,
    #[serde(rename = "observaciones")]
    pub remarks: &'static str,
}

impl Purchase {
    /// Makes up a plausible purchase dated `now`.
    ///
    /// The unit price is between 1000 and 15000 and the quantity between 1
    /// and 10; the total is their product.
    pub fn generate<R: Rng>(rng: &mut R, now: NaiveDateTime) -> Self {
        let unit_price: u32 = rng.gen_range(1000..=15000);
        let quantity: u32 = rng.gen_range(1..=10);

        let building: String = BuildingNumber().fake_with_rng(rng);
        let street: String = StreetName().fake_with_rng(rng);
        let city: String = CityName().fake_with_rng(rng);
        let zip: String = ZipCode().fake_with_rng(rng);
        let address = format!("{building} {street}\n{city}, {zip}")
            .replace(',', " -")
            .replace('\n', " ");

        Self {
            id: rng.gen_range(1..=999_999),
            issued_on: now.format("%d-%m-%Y").to_string(),
            name: Name().fake_with_rng(rng),
            city: CityName().fake_with_rng(rng),
            address,
            email: SafeEmail().fake_with_rng(rng),
            phone: PhoneNumber().fake_with_rng(rng),
            ip: IPv4().fake_with_rng(rng),
            quantity,
            total: unit_price * quantity,
            payment_mode: if rng.gen_bool(0.5) { "completo" } else { "fraccionado" },
            payment_status: if rng.gen_bool(0.5) { "exitoso" } else { "fallido" },
            timestamp: now.format("%d %b %Y - %I:%M %p").to_string(),
            remarks: if rng.gen_bool(0.5) {
                "Cliente frecuente"
            } else {
                "Promoción aplicada"
            },
        }
    }
}

/// Writes `purchases` to a new CSV file at `path`, header first.
///
/// # Errors
///
/// Returns an error if `purchases` is empty, or on any error creating or
/// writing the file.
pub fn write_purchases(path: impl AsRef<Path>, purchases: &[Purchase]) -> Result<()> {
    let path = path.as_ref();
    if purchases.is_empty() {
        bail!("refusing to write {} with no purchases", path.display());
    }
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for purchase in purchases {
        wtr.serialize(purchase)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Generates `count` purchases and writes them to
/// `dir/compras_YYYYmmdd_HHMMSS.csv`, named after `now`.
///
/// Returns the path of the new file.
///
/// # Errors
///
/// Returns an error if `count` is zero, or on any error creating the
/// directory or writing the file.
pub fn generate_batch<R: Rng>(
    dir: impl AsRef<Path>,
    count: usize,
    rng: &mut R,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        info!("created directory {}", dir.display());
    }
    let purchases: Vec<_> = (0..count).map(|_| Purchase::generate(rng, now)).collect();
    let path = dir.join(format!("compras_{}.csv", now.format("%Y%m%d_%H%M%S")));
    write_purchases(&path, &purchases)?;
    info!("wrote {count} purchase(s) to {}", path.display());
    Ok(path)
}
