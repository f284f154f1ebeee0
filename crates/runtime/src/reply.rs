use crate::box_gacha::BoxEntryStatus;
use crate::catalog::{DrawnItem, GachaListing};
use crate::engine::{BoxPlay, NormalPlay, StepStatus, StepupPlay};
use crate::frame::ByteFrame;
use crate::ledger::GachaPoints;
use crate::{GachaError, GachaResult};

const DRAWN_ITEM_LEN: usize = 6;

fn count_u8(count: usize) -> GachaResult<u8> {
    u8::try_from(count).map_err(|_| GachaError::InventoryOverflow { count })
}

/// Balances are signed in storage; the client only understands unsigned values.
pub fn wire_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

fn write_drawn(frame: &mut ByteFrame, items: &[DrawnItem]) {
    for item in items {
        item.write_to(frame);
    }
}

fn write_name(frame: &mut ByteFrame, name: Option<&str>) {
    let name = name.unwrap_or_default();
    let mut end = name.len().min(usize::from(u8::MAX));
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    frame.write_u8(end as u8).write_bytes(&name.as_bytes()[..end]);
}

pub fn normal_play(play: &NormalPlay) -> GachaResult<Vec<u8>> {
    let mut frame = ByteFrame::with_capacity(1 + play.items.len() * DRAWN_ITEM_LEN);
    frame.write_u8(count_u8(play.items.len())?);
    write_drawn(&mut frame, &play.items);
    Ok(frame.into_bytes())
}

/// `total:u8, random:u8`, then the guaranteed items followed by the random ones.
pub fn stepup_play(play: &StepupPlay) -> GachaResult<Vec<u8>> {
    let total = play.guaranteed.len() + play.random.len();
    let mut frame = ByteFrame::with_capacity(2 + total * DRAWN_ITEM_LEN);
    frame
        .write_u8(count_u8(total)?)
        .write_u8(count_u8(play.random.len())?);
    write_drawn(&mut frame, &play.guaranteed);
    write_drawn(&mut frame, &play.random);
    Ok(frame.into_bytes())
}

pub fn box_play(play: &BoxPlay) -> GachaResult<Vec<u8>> {
    let mut frame = ByteFrame::with_capacity(1 + play.items.len() * DRAWN_ITEM_LEN);
    frame.write_u8(count_u8(play.items.len())?);
    write_drawn(&mut frame, &play.items);
    Ok(frame.into_bytes())
}

pub fn box_status(status: &[BoxEntryStatus]) -> GachaResult<Vec<u8>> {
    let mut frame = ByteFrame::with_capacity(1 + status.len() * 5);
    frame.write_u8(count_u8(status.len())?);
    for entry in status {
        frame.write_u32(entry.entry_id).write_bool(entry.exhausted);
    }
    Ok(frame.into_bytes())
}

pub fn step_status(status: &StepStatus) -> Vec<u8> {
    let mut frame = ByteFrame::with_capacity(5);
    frame.write_u8(status.step).write_u32(status.server_time);
    frame.into_bytes()
}

pub fn gacha_points(points: &GachaPoints) -> Vec<u8> {
    let mut frame = ByteFrame::with_capacity(12);
    frame
        .write_u32(wire_u32(points.frontier_points))
        .write_u32(wire_u32(points.premium))
        .write_u32(wire_u32(points.trial));
    frame.into_bytes()
}

pub fn balance(value: i64) -> Vec<u8> {
    wire_u32(value).to_be_bytes().to_vec()
}

/// `count:u16`, then per gacha its header and entries. Entry names are empty past the
/// named entry types.
pub fn listing(listings: &[GachaListing]) -> GachaResult<Vec<u8>> {
    let count = u16::try_from(listings.len())
        .map_err(|_| GachaError::InventoryOverflow { count: listings.len() })?;

    let mut frame = ByteFrame::new();
    frame.write_u16(count);
    for listing in listings {
        let gacha = &listing.gacha;
        frame
            .write_u32(gacha.id)
            .write_u32(gacha.min_gr)
            .write_u32(gacha.min_hr)
            .write_u8(gacha.gacha_type)
            .write_bool(gacha.wide)
            .write_bool(gacha.recommended);
        write_name(&mut frame, Some(&gacha.name));
        write_name(&mut frame, Some(&gacha.url_banner));
        write_name(&mut frame, Some(&gacha.url_feature));
        write_name(&mut frame, Some(&gacha.url_thumbnail));

        frame.write_u8(count_u8(listing.entries.len())?);
        for entry in &listing.entries {
            frame
                .write_u8(entry.entry_type)
                .write_u8(entry.item_type)
                .write_u16(entry.item_number)
                .write_u16(entry.item_quantity)
                .write_u8(entry.rolls)
                .write_u32(wire_u32(entry.frontier_points))
                .write_u16(entry.daily_limit);
            write_name(&mut frame, entry.name.as_deref());
            frame.write_u8(count_u8(entry.items.len())?);
            for item in &entry.items {
                item.write_to(&mut frame);
            }
        }
    }
    Ok(frame.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Gacha, RewardItem};

    fn drawn(id: u16, rarity: u8) -> DrawnItem {
        DrawnItem { item: RewardItem::new(7, id, 1), rarity }
    }

    #[test]
    fn test_stepup_lists_guaranteed_first() {
        let play = StepupPlay {
            guaranteed: vec![drawn(0x0100, 0)],
            random: vec![drawn(0x0200, 4), drawn(0x0300, 2)],
            next_step: 1,
        };
        let bytes = stepup_play(&play).unwrap();
        assert_eq!(&bytes[..2], &[3, 2]);
        assert_eq!(&bytes[2..8], &[7, 0x01, 0x00, 0x00, 0x01, 0]);
        assert_eq!(&bytes[8..14], &[7, 0x02, 0x00, 0x00, 0x01, 4]);
        assert_eq!(bytes.len(), 2 + 3 * 6);
    }

    #[test]
    fn test_box_status_layout() {
        let status = vec![
            BoxEntryStatus { entry_id: 0x0102_0304, exhausted: true },
            BoxEntryStatus { entry_id: 9, exhausted: true },
        ];
        assert_eq!(box_status(&status).unwrap(), vec![2, 1, 2, 3, 4, 1, 0, 0, 0, 9, 1]);
    }

    #[test]
    fn test_negative_balances_clamp_to_zero() {
        let points = GachaPoints { frontier_points: -5, premium: 300, trial: i64::MAX };
        let bytes = gacha_points(&points);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &300u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &u32::MAX.to_be_bytes());
        assert_eq!(balance(-1), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_step_status_layout() {
        let bytes = step_status(&StepStatus { step: 2, server_time: 0x6000_0001 });
        assert_eq!(bytes, vec![2, 0x60, 0, 0, 1]);
    }

    #[test]
    fn test_oversized_reply_is_rejected() {
        let play = NormalPlay { items: vec![drawn(1, 1); 256], debit: None };
        assert!(matches!(normal_play(&play), Err(GachaError::InventoryOverflow { count: 256 })));
    }

    #[test]
    fn test_listing_sends_stored_gacha_type() {
        let listings = vec![GachaListing {
            gacha: Gacha { id: 4, name: "x".into(), gacha_type: 3, ..Default::default() },
            entries: Vec::new(),
        }];
        let bytes = listing(&listings).unwrap();
        assert_eq!(&bytes[..2], &[0, 1]);
        assert_eq!(bytes[2 + 12], 3);
    }

    #[test]
    fn test_name_truncates_on_char_boundary() {
        let mut frame = ByteFrame::new();
        let name = "é".repeat(200);
        write_name(&mut frame, Some(&name));
        let bytes = frame.into_bytes();
        assert_eq!(bytes[0], 254);
        assert!(std::str::from_utf8(&bytes[1..]).is_ok());
    }
}
