//! Turns raw model logits into an answer.

use vqa_core::{AnswerResult, Error, Result};

use crate::vocab::AnswerVocab;

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

/// Picks the answer and answerability with their softmax confidences.
///
/// `answerable_logits` must have two classes: index 1 means answerable.
pub fn decode(
    answer_logits: &[f32],
    answerable_logits: &[f32],
    vocab: &AnswerVocab,
) -> Result<AnswerResult> {
    if answer_logits.is_empty() {
        return Err(Error::inference("model returned no answer logits"));
    }
    if answerable_logits.len() != 2 {
        return Err(Error::inference(format!(
            "expected 2 answerable logits, got {}",
            answerable_logits.len()
        )));
    }
    if answer_logits.iter().chain(answerable_logits).any(|x| !x.is_finite()) {
        return Err(Error::inference("model returned non-finite logits"));
    }

    let answer_probs = softmax(answer_logits);
    let answerable_probs = softmax(answerable_logits);

    let answer_idx = argmax(&answer_probs)
        .ok_or_else(|| Error::inference("model returned no answer logits"))?;
    let answerable_idx = argmax(&answerable_probs)
        .ok_or_else(|| Error::inference("model returned no answerable logits"))?;

    let answer = vocab.label(answer_idx).ok_or_else(|| {
        Error::inference(format!(
            "answer index {} outside vocabulary of {}",
            answer_idx,
            vocab.len()
        ))
    })?;

    Ok(AnswerResult::new(
        answer,
        answer_probs[answer_idx],
        answerable_idx == 1,
        answerable_probs[answerable_idx],
    ))
}
