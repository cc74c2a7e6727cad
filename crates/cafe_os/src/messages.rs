#![forbid(unsafe_code)]

use cafe_kernel_contracts::language::SupportedLanguage;

/// Fixed replies the core can produce without any collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    PositivePreamble,
    NegativeAppendix,
    NotUnderstood,
    GenerativeUnavailable,
    GenericApology,
    EmptyMessage,
}

pub fn message(key: MessageKey, lang: SupportedLanguage) -> &'static str {
    use MessageKey::*;
    use SupportedLanguage::*;
    match (key, lang) {
        (PositivePreamble, Es) => "¡Me alegra saber que estás contento! ",
        (PositivePreamble, En) => "I'm glad you're happy! ",
        (PositivePreamble, Pt) => "Fico feliz em saber que está contente! ",

        (NegativeAppendix, Es) => {
            " Lamento escuchar eso. ¿Hay algo más en lo que pueda ayudarte para mejorar tu experiencia?"
        }
        (NegativeAppendix, En) => {
            " Sorry to hear that. Is there anything else I can help you with to improve your experience?"
        }
        (NegativeAppendix, Pt) => {
            " Lamento ouvir isso. Há algo mais em que posso ajudá-lo para melhorar sua experiência?"
        }

        (NotUnderstood, Es) => "No he entendido tu pregunta.",
        (NotUnderstood, En) => "I didn't understand your question.",
        (NotUnderstood, Pt) => "Não entendi sua pergunta.",

        (GenerativeUnavailable, Es) => "Lo siento, no he podido procesar tu solicitud en este momento.",
        (GenerativeUnavailable, En) => "Sorry, I couldn't process your request right now.",
        (GenerativeUnavailable, Pt) => {
            "Desculpe, não consegui processar sua solicitação neste momento."
        }

        (GenericApology, Es) => {
            "Lo siento, ocurrió un error inesperado al procesar tu pedido. Por favor, intenta de nuevo."
        }
        (GenericApology, En) => {
            "Sorry, an unexpected error occurred while processing your order. Please try again."
        }
        (GenericApology, Pt) => {
            "Desculpe, ocorreu um erro inesperado ao processar seu pedido. Por favor, tente novamente."
        }

        (EmptyMessage, Es) => "Por favor, escribe un mensaje.",
        (EmptyMessage, En) => "Please write a message.",
        (EmptyMessage, Pt) => "Por favor, escreva uma mensagem.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_messages_01_every_key_has_every_language() {
        let keys = [
            MessageKey::PositivePreamble,
            MessageKey::NegativeAppendix,
            MessageKey::NotUnderstood,
            MessageKey::GenerativeUnavailable,
            MessageKey::GenericApology,
            MessageKey::EmptyMessage,
        ];
        for k in keys {
            for lang in SupportedLanguage::ALL {
                assert!(!message(k, lang).trim().is_empty(), "{k:?} {lang:?}");
            }
        }
    }

    #[test]
    fn at_messages_02_personalization_fragments_keep_their_spacing() {
        for lang in SupportedLanguage::ALL {
            assert!(message(MessageKey::PositivePreamble, lang).ends_with(' '));
            assert!(message(MessageKey::NegativeAppendix, lang).starts_with(' '));
        }
    }
}
