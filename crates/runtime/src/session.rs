use serde::{Deserialize, Serialize};

use crate::engine::{GachaEngine, StepStatus};
use crate::reply;
use crate::store::Store;
use crate::{AccountId, CharacterId, GachaId, GachaResult, Player};

/// Acknowledgment queued back to the client under the request's handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Succeed(Vec<u8>),
    Fail(Vec<u8>),
}

impl Ack {
    pub fn fail() -> Self {
        Ack::Fail(vec![0; 4])
    }

    pub fn empty_success() -> Self {
        Ack::Succeed(vec![0; 4])
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Ack::Succeed(_))
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Ack::Succeed(payload) | Ack::Fail(payload) => payload,
        }
    }
}

pub trait Session: Send + Sync {
    fn character_id(&self) -> CharacterId;
    fn account_id(&self) -> AccountId;
    fn queue_ack(&self, ack_handle: u32, ack: Ack);

    fn player(&self) -> Player {
        Player::new(self.account_id(), self.character_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GachaRequest {
    PlayNormalGacha { gacha_id: GachaId, roll_type: u8 },
    PlayStepupGacha { gacha_id: GachaId, roll_type: u8 },
    PlayBoxGacha { gacha_id: GachaId, roll_type: u8 },
    GetBoxGachaInfo { gacha_id: GachaId },
    ResetBoxGachaInfo { gacha_id: GachaId },
    GetStepupStatus { gacha_id: GachaId },
    ReceiveGachaItem { freeze: bool },
    GetGachaPoint,
    UseGachaPoint { trial_coins: u32, premium_coins: u32 },
    ExchangeFpoint2Item { trade_id: u32, quantity: u16 },
    ExchangeItem2Fpoint { trade_id: u32, quantity: u16 },
    AcquireExchangeShop { purchases: Vec<(u32, u32)> },
    EnumerateGacha { hr: u32, gr: u32 },
}

impl GachaRequest {
    pub fn name(&self) -> &'static str {
        match self {
            GachaRequest::PlayNormalGacha { .. } => "PlayNormalGacha",
            GachaRequest::PlayStepupGacha { .. } => "PlayStepupGacha",
            GachaRequest::PlayBoxGacha { .. } => "PlayBoxGacha",
            GachaRequest::GetBoxGachaInfo { .. } => "GetBoxGachaInfo",
            GachaRequest::ResetBoxGachaInfo { .. } => "ResetBoxGachaInfo",
            GachaRequest::GetStepupStatus { .. } => "GetStepupStatus",
            GachaRequest::ReceiveGachaItem { .. } => "ReceiveGachaItem",
            GachaRequest::GetGachaPoint => "GetGachaPoint",
            GachaRequest::UseGachaPoint { .. } => "UseGachaPoint",
            GachaRequest::ExchangeFpoint2Item { .. } => "ExchangeFpoint2Item",
            GachaRequest::ExchangeItem2Fpoint { .. } => "ExchangeItem2Fpoint",
            GachaRequest::AcquireExchangeShop { .. } => "AcquireExchangeShop",
            GachaRequest::EnumerateGacha { .. } => "EnumerateGacha",
        }
    }
}

/// Writes that fail are answered with a failure ack.
fn mutation_ack(request: &str, player: Player, result: GachaResult<Vec<u8>>) -> Ack {
    match result {
        Ok(payload) => Ack::Succeed(payload),
        Err(e) => {
            tracing::warn!(
                "[handle_request::{}] character {} failed: {}",
                request, player.character_id, e
            );
            Ack::fail()
        }
    }
}

/// Status reads that fail still succeed, with the given default payload.
fn status_ack(request: &str, player: Player, result: GachaResult<Vec<u8>>, default: impl FnOnce() -> Vec<u8>) -> Ack {
    match result {
        Ok(payload) => Ack::Succeed(payload),
        Err(e) => {
            tracing::warn!(
                "[handle_request::{}] character {} degraded to default: {}",
                request, player.character_id, e
            );
            Ack::Succeed(default())
        }
    }
}

/// Runs one request to completion and queues exactly one ack for it.
pub async fn handle_request<S: Store>(
    engine: &GachaEngine<S>,
    session: &dyn Session,
    ack_handle: u32,
    request: GachaRequest,
) {
    let player = session.player();
    let name = request.name();
    tracing::debug!("[handle_request::{}] character {} handle {}", name, player.character_id, ack_handle);

    let ack = match request {
        GachaRequest::PlayNormalGacha { gacha_id, roll_type } => {
            let result = engine.play_normal(player, gacha_id, roll_type).await;
            mutation_ack(name, player, result.and_then(|play| reply::normal_play(&play)))
        }
        GachaRequest::PlayStepupGacha { gacha_id, roll_type } => {
            let result = engine.play_stepup(player, gacha_id, roll_type).await;
            mutation_ack(name, player, result.and_then(|play| reply::stepup_play(&play)))
        }
        GachaRequest::PlayBoxGacha { gacha_id, roll_type } => {
            let result = engine.play_box(player, gacha_id, roll_type).await;
            mutation_ack(name, player, result.and_then(|play| reply::box_play(&play)))
        }
        GachaRequest::GetBoxGachaInfo { gacha_id } => {
            let result = engine.box_status(player, gacha_id).await;
            status_ack(name, player, result.and_then(|status| reply::box_status(&status)), || vec![0])
        }
        GachaRequest::ResetBoxGachaInfo { gacha_id } => {
            let result = engine.reset_box(player, gacha_id).await;
            mutation_ack(name, player, result.map(|_| vec![0; 4]))
        }
        GachaRequest::GetStepupStatus { gacha_id } => {
            let result = engine.step_status(player, gacha_id).await;
            status_ack(name, player, result.map(|status| reply::step_status(&status)), || {
                reply::step_status(&StepStatus { step: 0, server_time: engine.server_time() })
            })
        }
        GachaRequest::ReceiveGachaItem { freeze } => {
            let result = engine.receive_items(player, freeze).await;
            status_ack(name, player, result.map(|drained| drained.emitted.encode()), || vec![0])
        }
        GachaRequest::GetGachaPoint => {
            let result = engine.gacha_points(player).await;
            status_ack(name, player, result.map(|points| reply::gacha_points(&points)), || vec![0; 12])
        }
        GachaRequest::UseGachaPoint { trial_coins, premium_coins } => {
            let result = engine.use_gacha_points(player, trial_coins, premium_coins).await;
            mutation_ack(name, player, result.map(|_| vec![0; 4]))
        }
        GachaRequest::ExchangeFpoint2Item { trade_id, quantity } => {
            let result = engine.exchange_fpoint_to_item(player, trade_id, quantity).await;
            mutation_ack(name, player, result.map(reply::balance))
        }
        GachaRequest::ExchangeItem2Fpoint { trade_id, quantity } => {
            let result = engine.exchange_item_to_fpoint(player, trade_id, quantity).await;
            mutation_ack(name, player, result.map(reply::balance))
        }
        GachaRequest::AcquireExchangeShop { purchases } => {
            let result = engine.acquire_exchange_shop(player, &purchases).await;
            mutation_ack(name, player, result.map(|_| vec![0; 4]))
        }
        GachaRequest::EnumerateGacha { hr, gr } => {
            let result = engine.listing(hr, gr).await;
            status_ack(name, player, result.and_then(|listing| reply::listing(&listing)), || vec![0; 2])
        }
    };

    session.queue_ack(ack_handle, ack);
}
